//! Google Gemini `generateContent` transport.

pub mod client;

pub use client::GeminiClient;
