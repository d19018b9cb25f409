fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // ESP-IDF link arguments are only needed for the hardware binary;
    // host builds (tests, fuzzing) skip the toolchain environment.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
