//! Provider implementations of the `recap_core::Provider` trait.

mod anthropic;

pub use anthropic::AnthropicProvider;
