fn main() {
    uniffi::generate_scaffolding("src/confbridge.udl").unwrap();
}
