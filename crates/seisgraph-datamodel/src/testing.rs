//! Shared set-up for tests that decode archives.

pub fn setup() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    crate::init().expect("class registration");
}
