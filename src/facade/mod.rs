mod client;

pub use client::CartBenchClient;
