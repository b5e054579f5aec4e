pub mod classify;
pub mod keygen;
pub mod probe;
pub mod remux;
pub mod storage;
pub mod video_service;
