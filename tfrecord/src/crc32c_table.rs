include!(concat!(env!("OUT_DIR"), "/crc32c_table.rs"));
