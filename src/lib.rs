//! Preprocessing of AES-128 power-trace captures: reference re-encryption
//! and leakage scoring, trace statistics, and unsigned fixed-point feature
//! quantization.

pub mod aes;
pub mod features;
pub mod leakage;
pub mod pipeline;
pub mod quantize;
pub mod read;
pub mod report;
pub mod tools;
