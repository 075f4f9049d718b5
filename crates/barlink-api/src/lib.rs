pub mod blobs;
pub mod chat;
pub mod error;
pub mod mail;
pub mod negotiate;
pub mod qr;
pub mod seats;
pub mod state;
pub mod storage;
pub mod tables;
