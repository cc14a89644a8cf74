/// Intercept messages using the `log` crate and print them to STDERR. Defaults to `info`, unless
/// `RUST_LOG` says otherwise.
pub fn setup() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();
}
