//! Build script for luaerror-core
//!
//! This script checks build requirements before compilation:
//! - Minimum Rust version (`let ... else` and `is_some_and` need Rust 1.70)
//! - Whether the target can resolve addresses inside loaded images
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer
//! - **Linux**: live image resolution through `dl_iterate_phdr`
//! - **Windows / macOS**: on-disk scanning only; the embedder supplies its
//!   own `SymbolResolver`

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    match rustc_version::version() {
        Ok(found) => {
            let minimum = rustc_version::Version::new(1, 70, 0);
            if found < minimum {
                panic!("luaerror-core requires Rust {minimum} or newer, found {found}");
            }
        }
        // Some build environments hide the compiler version
        Err(_) => println!("cargo:warning=could not verify Rust version"),
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "linux" {
        println!(
            "cargo:warning=no loaded-image resolver for target_os={target_os}; the embedder must provide a SymbolResolver"
        );
    }
}
