pub mod client;
pub mod model;

pub use client::{ModioClient, API_BASE};
pub use model::{DataPage, FileDownload, Game, Mod, ModFile, Slugged};
