pub mod defaults_provider;
