pub mod ollama;
pub mod rag;
pub mod storage;
