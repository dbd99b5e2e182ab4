use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

use super::drag;
use super::geometry;
use super::graph::{EdgePatch, NodeDataPatch};
use super::persist;
use super::render;
use super::state::{ElementRef, MindmapState};
use super::store::{
	CmsStore, DocumentStore, LoadSource, LocalStorageCache, PhaseStatus, SaveOutcome, load_graph,
	persist_seed, save_graph,
};
use super::types::{NodeKind, Position};

const DEFAULT_ENDPOINT: &str = "/api/canvas";
const POLL_INTERVAL_MS: i32 = 20_000;
const STATUS_CLEAR_MS: i32 = 2_500;
const DRAG_THRESHOLD: f64 = 3.0;

const SWATCHES: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Owned, cancellable handle for the admin sync poll. Dropping it clears
/// the interval, so a torn-down canvas never leaks recurring work.
struct PollHandle {
	id: i32,
	_closure: Closure<dyn FnMut()>,
}

impl PollHandle {
	fn start(interval_ms: i32, callback: impl FnMut() + 'static) -> Option<Self> {
		let window = web_sys::window()?;
		let closure: Closure<dyn FnMut()> = Closure::new(callback);
		let id = window
			.set_interval_with_callback_and_timeout_and_arguments_0(
				closure.as_ref().unchecked_ref(),
				interval_ms,
			)
			.ok()?;
		Some(Self { id, _closure: closure })
	}
}

impl Drop for PollHandle {
	fn drop(&mut self) {
		if let Some(window) = web_sys::window() {
			window.clear_interval_with_handle(self.id);
		}
	}
}

/// A root-level node released over a group is adopted by it. Children
/// never reach here: the drag clamp keeps them parented where they are.
fn adopt_on_release(state: &mut MindmapState, id: &str) {
	let Some(node) = state.graph.node(id) else {
		return;
	};
	if node.parent.is_some() {
		return;
	}
	let bounds = geometry::node_bounds(&state.graph, node);
	let (cx, cy) = (bounds.center_x(), bounds.center_y());
	let target = state
		.graph
		.nodes
		.iter()
		.filter(|g| g.kind == NodeKind::Group && g.id != id)
		.find(|g| geometry::node_bounds(&state.graph, g).contains(cx, cy))
		.map(|g| g.id.clone());
	if let Some(group_id) = target {
		state.graph.assign_to_group(id, &group_id);
	}
}

/// Mirror the machine's editing sub-state into the reactive layer: the
/// label snapshot shown in the inline editor, or `None` when not editing.
fn refresh_editing(state: &MindmapState, editing: RwSignal<Option<String>>) {
	let value = state.selection.editing().and_then(|element| match element {
		ElementRef::Node(id) => state.graph.node(id).map(|n| n.data.label.clone()),
		ElementRef::Edge(id) => state.graph.edge(id).map(|e| e.label.clone()),
	});
	editing.set(value);
}

fn outcome_message(outcome: &SaveOutcome) -> &'static str {
	match (&outcome.local, &outcome.remote) {
		(PhaseStatus::Ok, PhaseStatus::Ok) => "Saved",
		(PhaseStatus::Ok, PhaseStatus::Failed(_)) => "Saved locally; remote sync failed",
		(PhaseStatus::Failed(_), PhaseStatus::Ok) => "Saved remotely; local cache write failed",
		(PhaseStatus::Failed(_), PhaseStatus::Failed(_)) => "Save failed",
	}
}

fn input_value(ev: &web_sys::Event) -> String {
	ev.target()
		.and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok())
		.map(|input| input.value())
		.unwrap_or_default()
}

fn clear_status_later(status: RwSignal<Option<String>>, delay_ms: i32) {
	let Some(window) = web_sys::window() else {
		return;
	};
	let callback = Closure::once_into_js(move || status.set(None));
	let _ = window
		.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay_ms);
}

/// The embeddable mindmap canvas. The admin capability arrives as an
/// explicit signal; every editing control and the sync poll are gated on
/// it, and revoking it mid-edit drops the inline editor immediately.
#[component]
pub fn MindmapCanvas(
	/// Capability token: true while the surrounding app grants editing.
	#[prop(into)] admin: Signal<bool>,
	/// Document path in the remote store and the local cache.
	#[prop(into, default = String::from("mindmap/main"))] path: String,
	#[prop(default = None)] endpoint: Option<String>,
	#[prop(default = None)] auth_token: Option<String>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<MindmapState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let poll: Rc<RefCell<Option<PollHandle>>> = Rc::new(RefCell::new(None));

	let store = Rc::new(CmsStore::new(
		endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
		auth_token,
	));
	let cache = Rc::new(LocalStorageCache);
	let path = Rc::new(path);

	let status: RwSignal<Option<String>> = RwSignal::new(None);
	let editing: RwSignal<Option<String>> = RwSignal::new(None);

	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());
	let (store_init, cache_init, path_init) = (store.clone(), cache.clone(), path.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();

		let (w, h) = if fullscreen {
			(
				window.inner_width().unwrap().as_f64().unwrap(),
				window.inner_height().unwrap().as_f64().unwrap(),
			)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();
		*state_init.borrow_mut() = Some(MindmapState::new(w, h));

		let (state_load, store_load, cache_load, path_load) = (
			state_init.clone(),
			store_init.clone(),
			cache_init.clone(),
			path_init.clone(),
		);
		spawn_local(async move {
			let (graph, source) = load_graph(&*cache_load, &*store_load, path_load.as_str()).await;
			if source == LoadSource::Seed {
				let (store_seed, path_seed, seeded) =
					(store_load.clone(), path_load.clone(), graph.clone());
				spawn_local(async move {
					persist_seed(&*store_seed, path_seed.as_str(), &seeded).await;
				});
			}
			// no reconciliation with edits made while the load was in
			// flight: last write wins
			if let Some(ref mut s) = *state_load.borrow_mut() {
				s.graph = graph;
			}
		});

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let win: Window = web_sys::window().unwrap();
				let (nw, nh) = (
					win.inner_width().unwrap().as_f64().unwrap(),
					win.inner_height().unwrap().as_f64().unwrap(),
				);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = web_sys::window()
					.unwrap()
					.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// capability changes: force-exit inline editing and start or stop the
	// remote sync poll
	let (state_admin, poll_admin) = (state.clone(), poll.clone());
	let (store_poll, path_poll) = (store.clone(), path.clone());
	Effect::new(move |_| {
		let is_admin = admin.get();
		if let Some(ref mut s) = *state_admin.borrow_mut() {
			s.selection.set_admin(is_admin);
			refresh_editing(s, editing);
		}
		if !is_admin {
			*poll_admin.borrow_mut() = None;
			return;
		}
		let (state_tick, store_tick, path_tick) =
			(state_admin.clone(), store_poll.clone(), path_poll.clone());
		*poll_admin.borrow_mut() = PollHandle::start(POLL_INTERVAL_MS, move || {
			let (state_sync, store_sync, path_sync) =
				(state_tick.clone(), store_tick.clone(), path_tick.clone());
			spawn_local(async move {
				match store_sync.get(path_sync.as_str()).await {
					Ok(raw) => {
						let graph = persist::normalize(&raw);
						if !graph.nodes.is_empty() {
							if let Some(ref mut s) = *state_sync.borrow_mut() {
								s.graph = graph;
							}
						}
					}
					Err(err) => log::debug!("sync poll failed: {err}"),
				}
			});
		});
	});

	// `on_cleanup` requires `Send + Sync`, but `poll` is an `Rc` (CSR runs on
	// one thread). Wrap the handle so the closure satisfies the bound; the
	// wrapper is only ever touched on its creating thread.
	let poll_cleanup = leptos::__reexports::send_wrapper::SendWrapper::new(poll.clone());
	on_cleanup(move || {
		*poll_cleanup.borrow_mut() = None;
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut s) = *state_md.borrow_mut() {
			let hit = s.node_at_position(x, y).map(|n| (n.id.clone(), n.position));
			match hit {
				Some((id, position)) => {
					if ev.shift_key() && admin.get_untracked() {
						// shift-click pair: source first, then target
						match s.pending_connect.take() {
							Some(source) if source != id => s.graph.connect(&source, &id),
							Some(_) => {}
							None => s.pending_connect = Some(id.clone()),
						}
					}
					s.selection.select(ElementRef::Node(id.clone()));
					s.drag.active = true;
					s.drag.node_id = Some(id);
					s.drag.start_x = x;
					s.drag.start_y = y;
					s.drag.node_start_x = position.x;
					s.drag.node_start_y = position.y;
					s.drag.moved = false;
				}
				None => {
					if let Some(element) = s.element_at_position(x, y) {
						s.selection.select(element);
					} else {
						s.pan.active = true;
						s.pan.start_x = x;
						s.pan.start_y = y;
						s.pan.transform_start_x = s.transform.x;
						s.pan.transform_start_y = s.transform.y;
						s.pan.moved = false;
					}
				}
			}
			refresh_editing(s, editing);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.drag.active {
				if let Some(id) = s.drag.node_id.clone() {
					let (dx, dy) = (
						(x - s.drag.start_x) / s.transform.k,
						(y - s.drag.start_y) / s.transform.k,
					);
					if dx.abs() + dy.abs() > DRAG_THRESHOLD {
						s.drag.moved = true;
					}
					let new_pos =
						Position::new(s.drag.node_start_x + dx, s.drag.node_start_y + dy);
					drag::apply_drag(&mut s.graph, &id, new_pos);
				}
			} else if s.pan.active {
				s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
				s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
				if (x - s.pan.start_x).abs() + (y - s.pan.start_y).abs() > DRAG_THRESHOLD {
					s.pan.moved = true;
				}
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			if s.pan.active && s.pan.moved {
				s.selection.note_pan_end(js_sys::Date::now());
			}
			if s.drag.active && s.drag.moved {
				if let Some(id) = s.drag.node_id.clone() {
					adopt_on_release(s, &id);
				}
			}
			s.drag.active = false;
			s.drag.node_id = None;
			s.pan.active = false;
		}
	};

	// deselect rides the click event so the pan-release debounce in the
	// state machine can swallow the click that ends a pan
	let state_click = state.clone();
	let on_click = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut s) = *state_click.borrow_mut() {
			// the click that ends a node drag can land on empty canvas
			// when the clamp moved the node away from the cursor
			if s.drag.moved {
				s.drag.moved = false;
				return;
			}
			if s.element_at_position(x, y).is_none() {
				s.selection.canvas_click(js_sys::Date::now());
				s.pending_connect = None;
				refresh_editing(s, editing);
			}
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.drag.active = false;
			s.drag.node_id = None;
			s.pan.active = false;
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	let state_dbl = state.clone();
	let on_dblclick = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_dbl.borrow_mut() {
			if s.selection.begin_edit(admin.get_untracked()) {
				refresh_editing(s, editing);
			}
		}
	};

	let state_key = state.clone();
	let on_keydown = move |ev: KeyboardEvent| {
		let key = ev.key();
		if let Some(ref mut s) = *state_key.borrow_mut() {
			if key == "Escape" {
				s.pending_connect = None;
				s.selection.end_edit();
				refresh_editing(s, editing);
				return;
			}
			if (key == "Delete" || key == "Backspace") && admin.get_untracked() {
				if s.selection.editing().is_some() {
					return;
				}
				if let Some(element) = s.selection.selected().cloned() {
					s.graph.delete_element(element.id());
					s.selection.element_deleted(element.id());
					refresh_editing(s, editing);
				}
				return;
			}
			// pull the selected node back out to the canvas root
			if key == "u" && admin.get_untracked() {
				if let Some(ElementRef::Node(id)) = s.selection.selected().cloned() {
					s.graph.remove_from_group(&id);
				}
			}
		}
	};

	let (state_save, store_save, cache_save, path_save) =
		(state.clone(), store.clone(), cache.clone(), path.clone());
	let on_save = move |_: MouseEvent| {
		let graph = state_save.borrow().as_ref().map(|s| s.graph.clone());
		let Some(graph) = graph else {
			return;
		};
		status.set(Some("Saving…".into()));
		let (store_task, cache_task, path_task) =
			(store_save.clone(), cache_save.clone(), path_save.clone());
		spawn_local(async move {
			let outcome = save_graph(&*cache_task, &*store_task, path_task.as_str(), &graph).await;
			if !outcome.is_clean() {
				log::warn!("save finished with failures: {outcome:?}");
			}
			status.set(Some(outcome_message(&outcome).into()));
			clear_status_later(status, STATUS_CLEAR_MS);
		});
	};

	let state_add = state.clone();
	let on_add_node = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_add.borrow_mut() {
			let id = s.graph.add_node();
			s.selection.select(ElementRef::Node(id));
			refresh_editing(s, editing);
		}
	};

	let state_add_group = state.clone();
	let on_add_group = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_add_group.borrow_mut() {
			let id = s.graph.add_group();
			s.selection.select(ElementRef::Node(id));
			refresh_editing(s, editing);
		}
	};

	let state_toggle = state.clone();
	let on_toggle_edit = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_toggle.borrow_mut() {
			if s.selection.editing().is_some() {
				s.selection.end_edit();
			} else {
				s.selection.begin_edit(admin.get_untracked());
			}
			refresh_editing(s, editing);
		}
	};

	let state_input = state.clone();
	let on_edit_input = move |ev: web_sys::Event| {
		let value = input_value(&ev);
		if let Some(ref mut s) = *state_input.borrow_mut() {
			let element = s.selection.editing().cloned();
			match element {
				Some(ElementRef::Node(id)) => s.graph.update_node_data(
					&id,
					NodeDataPatch { label: Some(value), ..Default::default() },
				),
				Some(ElementRef::Edge(id)) => s
					.graph
					.update_edge(&id, EdgePatch { label: Some(value), animated: None }),
				None => {}
			}
		}
	};

	let state_edit_key = state.clone();
	let on_edit_key = move |ev: KeyboardEvent| {
		ev.stop_propagation();
		if ev.key() == "Enter" || ev.key() == "Escape" {
			if let Some(ref mut s) = *state_edit_key.borrow_mut() {
				s.selection.end_edit();
				refresh_editing(s, editing);
			}
		}
	};

	let swatches = SWATCHES
		.iter()
		.map(|&color| {
			let state_color = state.clone();
			view! {
				<button
					class="mindmap-swatch"
					style=format!("background: {color}; width: 18px; height: 18px;")
					on:click=move |_| {
						if let Some(ref mut s) = *state_color.borrow_mut() {
							let selected = s.selection.selected().cloned();
							if let Some(ElementRef::Node(id)) = selected {
								s.graph.update_node_data(&id, NodeDataPatch {
									background_color: Some(color.to_string()),
									..Default::default()
								});
							}
						}
					}
				></button>
			}
		})
		.collect_view();

	view! {
		<div class="mindmap-wrap" style="position: relative;">
			<canvas
				node_ref=canvas_ref
				class="mindmap-canvas"
				tabindex="0"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:click=on_click
				on:dblclick=on_dblclick
				on:wheel=on_wheel
				on:keydown=on_keydown
				style="display: block; cursor: grab;"
			/>
			<div
				class="mindmap-controls"
				style="position: absolute; top: 8px; left: 8px; gap: 6px;"
				style:display=move || if admin.get() { "flex" } else { "none" }
			>
				<button on:click=on_save>"Save"</button>
				<button on:click=on_add_node>"Add node"</button>
				<button on:click=on_add_group>"Add group"</button>
				<button on:click=on_toggle_edit>"Edit text"</button>
				{swatches}
			</div>
			<input
				class="mindmap-edit"
				style="position: absolute; top: 44px; left: 8px;"
				style:display=move || if editing.get().is_some() { "block" } else { "none" }
				prop:value=move || editing.get().unwrap_or_default()
				on:input=on_edit_input
				on:keydown=on_edit_key
			/>
			<div class="mindmap-status" style="position: absolute; bottom: 8px; left: 8px;">
				{move || status.get()}
			</div>
		</div>
	}
}
