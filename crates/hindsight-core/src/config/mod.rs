mod settings;

pub use settings::MemoryConfig;
