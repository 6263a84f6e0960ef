
mod stream_tests;
