use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlAnchorElement, HtmlElement, HtmlIFrameElement, KeyboardEvent};
use yew::prelude::*;

use crate::config::Settings;
use crate::dom::{self, Listener};
use crate::interstitial::controller::{Controller, DismissReason, Stage, Timing, ViewerExit, CONFIRM_LABEL};
use crate::interstitial::scheduler::{GlooScheduler, TimerEvent};
use crate::interstitial::viewer::{FrameInspector, FrameProbe, ViewerSession};

const FRAME_SANDBOX: &str = "allow-scripts allow-same-origin allow-popups allow-forms";
const EXTERNAL_REL: &str = "noopener noreferrer";

#[derive(Properties, PartialEq)]
pub struct InterstitialProps {
    pub settings: Settings,
}

pub enum InterstitialMsg {
    Activate(String),
    Confirm,
    Dismiss(DismissReason),
    Timer(TimerEvent),
    FrameLoaded,
    CloseViewer(ViewerExit),
    Escape,
}

/// Stands in for the iframe when its node is not mounted.
struct DetachedFrame;

impl FrameInspector for DetachedFrame {
    fn probe(&self) -> FrameProbe {
        FrameProbe::NoDocument
    }

    fn has_source(&self) -> bool {
        false
    }
}

/// Disclaimer dialog and full-screen viewer for outbound links.
pub struct Interstitial {
    controller: Controller<GlooScheduler>,
    confirm_ref: NodeRef,
    backdrop_ref: NodeRef,
    frame_ref: NodeRef,
    _link_listener: Option<Listener>,
    escape_listener: Option<Listener>,
    scroll_locked: bool,
}

fn redirect_anchor(event: &Event, selector: &str) -> Option<HtmlAnchorElement> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    target.closest(selector).ok()??.dyn_into::<HtmlAnchorElement>().ok()
}

impl Interstitial {
    /// Attaches the Escape listener and locks scrolling while an overlay is up,
    /// and releases both as soon as none is.
    fn sync_page(&mut self, ctx: &Context<Self>) {
        let open = self.controller.is_open();
        let Some(document) = dom::document() else {
            return;
        };

        if open && self.escape_listener.is_none() {
            let on_escape = ctx.link().callback(|_: ()| InterstitialMsg::Escape);
            self.escape_listener = Some(Listener::new(&document, "keydown", move |event: Event| {
                let is_escape = event
                    .dyn_ref::<KeyboardEvent>()
                    .map_or(false, |event| event.key() == "Escape");
                if is_escape {
                    on_escape.emit(());
                }
            }));
        } else if !open {
            self.escape_listener = None;
        }

        if open != self.scroll_locked {
            dom::set_scroll_locked(&document, open);
            self.scroll_locked = open;
        }
    }

    fn view_dialog(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();
        let dialog = self.controller.dialog();
        let unlocked = dialog.map_or(true, |dialog| dialog.countdown.is_unlocked());
        let label = dialog.map_or_else(|| CONFIRM_LABEL.to_string(), |dialog| dialog.countdown.label());

        let on_backdrop = {
            let backdrop_ref = self.backdrop_ref.clone();
            let on_dismiss = link.callback(InterstitialMsg::Dismiss);
            Callback::from(move |e: MouseEvent| {
                if let Some(backdrop) = backdrop_ref.get().and_then(|node| node.dyn_into::<Element>().ok()) {
                    if dom::targets_self(&e, &backdrop) {
                        on_dismiss.emit(DismissReason::Backdrop);
                    }
                }
            })
        };

        html! {
            <div
                ref={self.backdrop_ref.clone()}
                class={classes!(
                    dialog.is_none().then(|| "hidden"),
                    "fixed", "inset-0", "bg-gray-900/50", "backdrop-blur-sm", "z-50",
                    "flex", "items-center", "justify-center", "p-4"
                )}
                role="dialog"
                aria-modal="true"
                aria-labelledby="interstitial-title"
                onclick={on_backdrop}
            >
                <div class="bg-white rounded-2xl p-6 md:p-8 max-w-md w-full shadow-xl relative">
                    <button
                        class="absolute top-4 right-4 text-stone-400 hover:text-stone-600 transition-colors"
                        aria-label="閉じる"
                        onclick={link.callback(|_| InterstitialMsg::Dismiss(DismissReason::CloseIcon))}
                    >
                        <svg class="w-6 h-6" fill="none" stroke="currentColor" viewBox="0 0 24 24" stroke-width="2">
                            <path stroke-linecap="round" stroke-linejoin="round" d="M6 18L18 6M6 6l12 12"/>
                        </svg>
                    </button>

                    <div class="flex justify-center mb-4">
                        <div class="w-14 h-14 bg-sky-100 rounded-full flex items-center justify-center">
                            <svg class="w-7 h-7 text-sky-600" fill="none" stroke="currentColor" viewBox="0 0 24 24" stroke-width="2">
                                <path stroke-linecap="round" stroke-linejoin="round" d="M10 6H6a2 2 0 00-2 2v10a2 2 0 002 2h10a2 2 0 002-2v-4M14 4h6m0 0v6m0-6L10 14"/>
                            </svg>
                        </div>
                    </div>

                    <h2 id="interstitial-title" class="text-xl font-bold text-center text-stone-900 mb-2">
                        {"外部サイトへ移動します"}
                    </h2>
                    <p class="text-sm text-center text-stone-600 mb-6">
                        {"公式配信サイトに移動します。"}<br/>
                        {"外部サイトのコンテンツについて当サイトは責任を負いません。"}
                    </p>

                    <div class="flex flex-col gap-3">
                        <button
                            ref={self.confirm_ref.clone()}
                            class={classes!(
                                "w-full", "px-4", "py-3", "bg-sky-600", "hover:bg-sky-700", "text-white",
                                "font-semibold", "rounded-lg", "transition-colors", "focus:outline-none",
                                "focus:ring-2", "focus:ring-sky-500", "focus:ring-offset-2",
                                (!unlocked).then(|| "opacity-60"),
                                (!unlocked).then(|| "cursor-not-allowed")
                            )}
                            disabled={!unlocked}
                            onclick={link.callback(|_| InterstitialMsg::Confirm)}
                        >
                            {label}
                        </button>
                        <button
                            class="w-full px-4 py-3 bg-stone-100 hover:bg-stone-200 text-stone-700 font-semibold rounded-lg transition-colors focus:outline-none focus:ring-2 focus:ring-stone-400 focus:ring-offset-2"
                            onclick={link.callback(|_| InterstitialMsg::Dismiss(DismissReason::Cancel))}
                        >
                            {"キャンセル"}
                        </button>
                    </div>

                    <p class="text-xs text-center text-stone-500 mt-4">
                        <svg class="w-4 h-4 inline-block mr-1" fill="none" stroke="currentColor" viewBox="0 0 24 24">
                            <path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M9 12l2 2 4-4m5.618-4.016A11.955 11.955 0 0112 2.944a11.955 11.955 0 01-8.618 3.04A12.02 12.02 0 003 9c0 5.591 3.824 10.29 9 11.622 5.176-1.332 9-6.03 9-11.622 0-1.042-.133-2.052-.382-3.016z"/>
                        </svg>
                        {"安全な公式サイトです"}
                    </p>
                </div>
            </div>
        }
    }

    fn view_viewer(&self, ctx: &Context<Self>, session: &ViewerSession) -> Html {
        let link = ctx.link();
        let url = session.url().to_string();
        let blocked = session.is_blocked();

        html! {
            <div
                id="reading-modal"
                class="fixed inset-0 bg-black z-[100] flex flex-col"
                role="dialog"
                aria-modal="true"
                aria-label="外部コンテンツビューア"
            >
                <div class="bg-stone-900 text-white px-4 py-3 flex items-center justify-between shadow-lg">
                    <div class="flex items-center gap-3">
                        <button
                            class="flex items-center gap-2 px-3 py-1.5 bg-stone-700 hover:bg-stone-600 rounded-lg transition-colors focus:outline-none focus:ring-2 focus:ring-stone-500"
                            onclick={link.callback(|_| InterstitialMsg::CloseViewer(ViewerExit::Back))}
                        >
                            <svg class="w-4 h-4" fill="none" stroke="currentColor" viewBox="0 0 24 24" stroke-width="2">
                                <path stroke-linecap="round" stroke-linejoin="round" d="M10 19l-7-7m0 0l7-7m-7 7h18"/>
                            </svg>
                            <span class="text-sm font-medium">{"戻る"}</span>
                        </button>
                        <div class="h-6 w-px bg-stone-700"></div>
                        <span class="text-sm text-stone-400">{"外部コンテンツを表示中"}</span>
                    </div>
                    <a
                        href={url.clone()}
                        target="_blank"
                        rel={EXTERNAL_REL}
                        class="flex items-center gap-2 px-3 py-1.5 bg-sky-600 hover:bg-sky-700 rounded-lg transition-colors text-sm font-medium focus:outline-none focus:ring-2 focus:ring-sky-500"
                    >
                        {"新しいタブで開く"}
                    </a>
                </div>

                <iframe
                    ref={self.frame_ref.clone()}
                    src={url.clone()}
                    class={classes!("flex-1", "w-full", "border-0", "bg-white", blocked.then(|| "hidden"))}
                    sandbox={FRAME_SANDBOX}
                    referrerpolicy="no-referrer"
                    loading="eager"
                    title="External Content"
                    allow="fullscreen"
                    onload={link.callback(|_: Event| InterstitialMsg::FrameLoaded)}
                />

                <div class={classes!(
                    if blocked { "flex" } else { "hidden" },
                    "flex-1", "items-center", "justify-center", "bg-stone-50"
                )}>
                    <div class="text-center p-8 max-w-md">
                        <h3 class="text-lg font-bold text-stone-900 mb-2">{"埋め込み表示できません"}</h3>
                        <p class="text-sm text-stone-600 mb-4">
                            {"このサイトは埋め込み表示をブロックしています。"}<br/>
                            {"新しいタブで開いてご覧ください。"}
                        </p>
                        <a
                            href={url.clone()}
                            target="_blank"
                            rel={EXTERNAL_REL}
                            class="inline-flex items-center gap-2 px-6 py-3 bg-sky-600 hover:bg-sky-700 text-white font-semibold rounded-lg transition-colors focus:outline-none focus:ring-2 focus:ring-sky-500"
                        >
                            {"新しいタブで開く"}
                        </a>
                    </div>
                </div>

                <div class="bg-stone-900 text-stone-400 px-4 py-2 text-xs text-center border-t border-stone-800">
                    <span>{"Content from: "}</span>
                    <a href={url} target="_blank" rel={EXTERNAL_REL} class="text-sky-400 hover:text-sky-300 underline">
                        {session.origin_label()}
                    </a>
                    <span class="mx-2">{"•"}</span>
                    <span>{"当サイトは外部コンテンツを所有していません"}</span>
                </div>
            </div>
        }
    }
}

impl Component for Interstitial {
    type Message = InterstitialMsg;
    type Properties = InterstitialProps;

    fn create(ctx: &Context<Self>) -> Self {
        let settings = &ctx.props().settings;
        let scheduler = GlooScheduler::new(ctx.link().callback(InterstitialMsg::Timer));

        let selector = settings.redirect_selector();
        let on_activate = ctx.link().callback(InterstitialMsg::Activate);
        let link_listener = dom::document().map(|document| {
            Listener::new(&document, "click", move |event: Event| {
                if let Some(anchor) = redirect_anchor(&event, &selector) {
                    event.prevent_default();
                    on_activate.emit(anchor.href());
                }
            })
        });

        Self {
            controller: Controller::new(scheduler, Timing::from(settings)),
            confirm_ref: NodeRef::default(),
            backdrop_ref: NodeRef::default(),
            frame_ref: NodeRef::default(),
            _link_listener: link_listener,
            escape_listener: None,
            scroll_locked: false,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        let changed = match msg {
            InterstitialMsg::Activate(url) => self.controller.activate(url),
            InterstitialMsg::Confirm => self.controller.confirm(),
            InterstitialMsg::Dismiss(reason) => self.controller.dismiss(reason),
            InterstitialMsg::Timer(event) => {
                match self.frame_ref.cast::<HtmlIFrameElement>() {
                    Some(frame) => self.controller.on_timer(event, &frame),
                    None => self.controller.on_timer(event, &DetachedFrame),
                }
                true
            }
            InterstitialMsg::FrameLoaded => {
                self.controller.frame_loaded();
                false
            }
            InterstitialMsg::CloseViewer(exit) => self.controller.close_viewer(exit),
            InterstitialMsg::Escape => self.controller.escape(),
        };
        self.sync_page(ctx);
        changed
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        if self.controller.take_focus_request() {
            if let Some(button) = self.confirm_ref.cast::<HtmlElement>() {
                let _ = button.focus();
            }
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        if self.controller.has_running_timers() {
            log::debug!("Cancelling interstitial timers");
        }
        self.controller.teardown();
        if self.scroll_locked {
            if let Some(document) = dom::document() {
                dom::set_scroll_locked(&document, false);
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <>
                { self.view_dialog(ctx) }
                {
                    match self.controller.stage() {
                        Stage::Viewing(session) => self.view_viewer(ctx, session),
                        Stage::Idle | Stage::Confirming(_) => html! {},
                    }
                }
            </>
        }
    }
}
