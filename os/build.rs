fn main() {
    #[cfg(feature = "qemu")]
    println!("cargo:rustc-link-arg=-Tsrc/linker.ld");

    println!("cargo:rerun-if-changed=src/linker.ld");
    println!("cargo:rerun-if-changed=src/entry.S");
}
