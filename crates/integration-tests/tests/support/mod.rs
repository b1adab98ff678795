pub mod mock_completions;
pub mod relay_app;
