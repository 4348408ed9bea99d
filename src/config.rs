//! Loading configuration for [`crate::AotObject`]
//!
//! Controls where the module header is searched for and which post-processing steps run while
//! a binary is loaded.

/// Configuration for loading a NativeAOT module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    /// Region searched first for the `RTR` module header. Every region is searched when this is
    /// `None` or when the named region does not hold a valid header.
    pub header_section: Option<String>,

    /// Rehydrate the dehydrated data section while loading.
    /// A failure is logged and leaves the object without a hydrated region.
    pub rehydrate: bool,

    /// Sweep the rehydrated region for pointer-sized values that land inside the image
    pub sweep_pointers: bool,

    /// Name of the region the rehydrated data is mapped as
    pub hydrated_region_name: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            header_section: Some(".rdata".to_string()),
            rehydrate: true,
            sweep_pointers: true,
            hydrated_region_name: ".hydrated".to_string(),
        }
    }
}

impl LoadConfig {
    /// Only locates the module header; no rehydration and no pointer sweep
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            rehydrate: false,
            sweep_pointers: false,
            ..Self::default()
        }
    }

    /// Every post-processing step enabled
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }
}
