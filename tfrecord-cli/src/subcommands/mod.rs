mod cat;
pub use cat::CatApp;

mod verify;
pub use verify::VerifyApp;

mod write;
pub use write::WriteApp;
