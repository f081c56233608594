pub mod poll_interval;
