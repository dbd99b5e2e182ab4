//! CSR entry point: mount the app router onto the document body.

use mindmap_canvas::{App, init_logging};

fn main() {
	init_logging();
	leptos::mount::mount_to_body(App);
}
