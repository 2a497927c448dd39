// Integration tests follow the organization suggested by Matklad:
// https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod mm1_queue;
mod onoff_pipeline;
mod process_interaction;
mod trace_output;
