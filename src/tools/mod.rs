mod image_decoder;
mod memory_monitor;
mod path_validator;
mod progress_bar;
mod sequence_scanner;
pub mod view_math;

pub use image_decoder::{DecodedImage, ImageCrateDecoder, ImageDecoder};
pub use memory_monitor::{MemoryMonitor, format_bytes};
pub use path_validator::{ensure_parent_directory, validate_directory_exists};
pub use progress_bar::create_progress_bar;
pub use sequence_scanner::{
    IMAGE_EXTENSIONS, SequenceEntry, extract_index, list_layer_directories, scan_sequence_folder,
    select_every_nth,
};
pub use view_math::{
    Dimensions, PixelRect, PlayDirection, RenderParams, ViewState, ZoomLimits, apply_pan,
    apply_zoom, clamp_pan, fit_scale, render_params, render_params_with_reference,
    render_view_into,
};
