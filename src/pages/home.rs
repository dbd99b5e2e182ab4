use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::components::mindmap::MindmapCanvas;

fn checkbox_state(ev: &web_sys::Event) -> bool {
	ev.target()
		.and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok())
		.map(|input| input.checked())
		.unwrap_or(false)
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	// Stand-in for the session-derived capability a host app would pass in.
	let admin = RwSignal::new(false);

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<MindmapCanvas admin=admin fullscreen=true />
				<div class="graph-overlay" style="pointer-events: none;">
					<h1>"Mindmap"</h1>
					<p class="subtitle">
						"Drag nodes to reposition. Scroll to zoom. Drag the background to pan."
					</p>
					<label style="pointer-events: auto;">
						<input
							type="checkbox"
							on:change=move |ev: web_sys::Event| admin.set(checkbox_state(&ev))
						/>
						" Edit mode"
					</label>
				</div>
			</div>
		</ErrorBoundary>
	}
}
