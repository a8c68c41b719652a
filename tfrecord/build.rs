// Copyright 2011, The Snappy-Rust Authors. All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright
// notice, this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above
// copyright notice, this list of conditions and the following disclaimer
// in the documentation and/or other materials provided with the
// distribution.
//     * Neither the name of the copyright holder nor the names of its
// contributors may be used to endorse or promote products derived from
// this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Castagnoli polynomial in reversed bit order.
const CASTAGNOLI_POLY: u32 = 0x82f63b78;

/// Number of tables used by the slicing-by-16 checksum.
const SLICES: usize = 16;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if let Err(err) = try_main() {
        panic!("{}", err);
    }
}

fn try_main() -> Result<()> {
    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or("OUT_DIR environment variable not defined")?;
    write_crc32c_tables(&out_dir.join("crc32c_table.rs"))
}

fn write_crc32c_tables(out_path: &Path) -> Result<()> {
    let mut out = io::BufWriter::new(File::create(out_path)?);

    let tables = slicing_tables(CASTAGNOLI_POLY);

    writeln!(out, "pub const TABLE: [u32; 256] = [")?;
    for &x in tables[0].iter() {
        writeln!(out, "    {:#010x},", x)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub const TABLE16: [[u32; 256]; {}] = [", SLICES)?;
    for table in tables.iter() {
        writeln!(out, "    [")?;
        for &x in table.iter() {
            writeln!(out, "        {:#010x},", x)?;
        }
        writeln!(out, "    ],")?;
    }
    writeln!(out, "];")?;

    out.flush()?;

    Ok(())
}

/// Tables for slicing-by-16: `tables[0]` is the byte-wise table, `tables[j]`
/// advances a byte through `j` additional zero bytes.
fn slicing_tables(poly: u32) -> [[u32; 256]; SLICES] {
    let mut tables = [[0; 256]; SLICES];
    tables[0] = bytewise_table(poly);
    for i in 0..256 {
        let mut crc = tables[0][i];
        for table in tables.iter_mut().skip(1) {
            crc = (crc >> 8) ^ bytewise_table_entry(poly, crc as u8);
            table[i] = crc;
        }
    }
    tables
}

fn bytewise_table(poly: u32) -> [u32; 256] {
    let mut table = [0; 256];
    for (b, entry) in table.iter_mut().enumerate() {
        *entry = bytewise_table_entry(poly, b as u8);
    }
    table
}

fn bytewise_table_entry(poly: u32, b: u8) -> u32 {
    let mut crc = b as u32;
    for _ in 0..8 {
        if crc & 1 == 1 {
            crc = (crc >> 1) ^ poly;
        } else {
            crc >>= 1;
        }
    }
    crc
}
