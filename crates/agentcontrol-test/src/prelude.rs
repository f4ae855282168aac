//! Prelude module - commonly used test helpers.

pub use crate::{
    ECHO_HELLO_MANIFEST, RecordingRegistrar, TestHome, TestProject, init_test_tracing,
    test_command, test_pipeline,
};
