//! The one remotely invocable tool recap exposes.

mod episode;

pub use episode::SummarizeEpisodeTool;
