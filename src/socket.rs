use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo::timers::future::TimeoutFuture;
use js_sys::Math;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use hunter2_live_core::NetDelayConfig;

#[allow(dead_code)]
struct WsHandlers {
    onopen: Closure<dyn FnMut(Event)>,
    onmessage: Closure<dyn FnMut(MessageEvent)>,
    onerror: Closure<dyn FnMut(Event)>,
    onclose: Closure<dyn FnMut(Event)>,
}

#[derive(Clone)]
pub(crate) struct SocketCallbacks {
    pub(crate) on_open: Rc<dyn Fn()>,
    pub(crate) on_text: Rc<dyn Fn(String)>,
    pub(crate) on_error: Rc<dyn Fn(String)>,
    /// Fires for failed attempts and unexpected closes, never after
    /// [`LiveSocketAdapter::disconnect`].
    pub(crate) on_close: Rc<dyn Fn()>,
}

/// Text-frame WebSocket wrapper for the live puzzle feed.
///
/// Clones share one socket. Every connect or disconnect bumps `generation`,
/// and a close event from an older generation is ignored.
#[derive(Clone)]
pub(crate) struct LiveSocketAdapter {
    ws: Rc<RefCell<Option<WebSocket>>>,
    handlers: Rc<RefCell<Option<WsHandlers>>>,
    generation: Rc<Cell<u64>>,
    net: Rc<Cell<NetDelayConfig>>,
}

fn send_text_with_delay(ws: &WebSocket, text: String, net: NetDelayConfig) {
    let delay = net.outbound_delay_ms(Math::random());
    if delay == 0 {
        let _ = ws.send_with_str(&text);
        return;
    }
    let ws = ws.clone();
    spawn_local(async move {
        TimeoutFuture::new(delay).await;
        if ws.ready_state() == WebSocket::OPEN {
            let _ = ws.send_with_str(&text);
        }
    });
}

impl LiveSocketAdapter {
    pub(crate) fn new() -> Self {
        Self {
            ws: Rc::new(RefCell::new(None)),
            handlers: Rc::new(RefCell::new(None)),
            generation: Rc::new(Cell::new(0)),
            net: Rc::new(Cell::new(NetDelayConfig::default())),
        }
    }

    pub(crate) fn connect(&self, url: &str, net: NetDelayConfig, callbacks: SocketCallbacks) {
        self.disconnect();
        let generation = self.generation.get();
        self.net.set(net);

        let url = url.trim();
        let ws = match WebSocket::new(url) {
            Ok(ws) => ws,
            Err(_) => {
                gloo::console::warn!("failed to open live socket", url);
                (callbacks.on_close)();
                return;
            }
        };
        *self.ws.borrow_mut() = Some(ws.clone());

        let onopen = {
            let url = url.to_string();
            let on_open = callbacks.on_open.clone();
            Closure::wrap(Box::new(move |_event: Event| {
                gloo::console::log!("live socket connected", url.clone());
                on_open();
            }) as Box<dyn FnMut(Event)>)
        };
        let onmessage = {
            let on_text = callbacks.on_text.clone();
            Closure::wrap(Box::new(move |event: MessageEvent| {
                let Some(text) = event.data().as_string() else {
                    gloo::console::warn!("ignoring non-text live frame");
                    return;
                };
                let delay = net.inbound_delay_ms(Math::random());
                if delay == 0 {
                    on_text(text);
                    return;
                }
                let on_text = on_text.clone();
                spawn_local(async move {
                    TimeoutFuture::new(delay).await;
                    on_text(text);
                });
            }) as Box<dyn FnMut(MessageEvent)>)
        };
        let onerror = {
            let url = url.to_string();
            let on_error = callbacks.on_error.clone();
            Closure::wrap(Box::new(move |_event: Event| {
                gloo::console::warn!("live socket error", url.clone());
                on_error(format!("socket error on {url}"));
            }) as Box<dyn FnMut(Event)>)
        };
        let onclose = {
            let ws_ref = self.ws.clone();
            let handlers_ref = self.handlers.clone();
            let current = self.generation.clone();
            let url = url.to_string();
            let on_close = callbacks.on_close.clone();
            Closure::wrap(Box::new(move |event: Event| {
                if current.get() != generation {
                    return;
                }
                ws_ref.borrow_mut().take();
                handlers_ref.borrow_mut().take();
                match event.dyn_ref::<CloseEvent>() {
                    Some(close) if !close.reason().is_empty() => {
                        gloo::console::log!("live socket closed", url.clone(), close.code(), close.reason());
                    }
                    Some(close) => gloo::console::log!("live socket closed", url.clone(), close.code()),
                    None => gloo::console::log!("live socket closed", url.clone()),
                }
                on_close();
            }) as Box<dyn FnMut(Event)>)
        };

        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

        *self.handlers.borrow_mut() = Some(WsHandlers {
            onopen,
            onmessage,
            onerror,
            onclose,
        });
    }

    /// Dropped silently unless the socket is open.
    pub(crate) fn send_text(&self, text: String) {
        let ws = {
            let ws_guard = self.ws.borrow();
            let Some(ws) = ws_guard.as_ref() else {
                return;
            };
            ws.clone()
        };
        if ws.ready_state() != WebSocket::OPEN {
            return;
        }
        send_text_with_delay(&ws, text, self.net.get());
    }

    pub(crate) fn disconnect(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        self.handlers.borrow_mut().take();
        if let Some(ws) = self.ws.borrow_mut().take() {
            let _ = ws.close();
        }
    }
}

impl Default for LiveSocketAdapter {
    fn default() -> Self {
        Self::new()
    }
}
