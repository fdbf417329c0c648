fn main() {
    // Emit ESP-IDF link arguments only when the firmware feature is on;
    // host builds (tests, fuzzing) need no toolchain.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
