// build.rs - Build script for i18next-harvest
//
// Sets up the build environment for the optional Node.js native addon
// (the `napi` feature).

fn main() {
    napi_build::setup();
}
