use leptos::logging::log;
use leptos::*;

use crate::api::ApiClient;
use crate::chats;
use crate::conversation::Conversation;
use crate::loading::Loading;
use crate::login::Login;
use crate::nav::Nav;
use crate::session::Session;
use crate::state::ChatSummary;
use crate::users::UserDirectory;

/// Initial deep link: `/chats?chat=7` opens chat 7 on load.
fn chat_from_query() -> Option<i64> {
    let search = window().location().search().ok()?;
    if search.is_empty() {
        return None;
    }
    let url = url::Url::parse(&format!("http://someUrl.com{search}")).ok()?;
    url.query_pairs()
        .find_map(|(key, value)| if key == "chat" { value.parse().ok() } else { None })
}

#[component]
pub fn App() -> impl IntoView {
    let (session, set_session) = create_signal(Session::load());
    let (selected, set_selected) = create_signal(chat_from_query());
    let (reload, set_reload) = create_signal(0u32);
    let users = UserDirectory::new();

    let load = create_resource(
        move || (session.get(), reload.get()),
        move |(session, _)| async move {
            let Some(session) = session else {
                return Ok(Vec::new());
            };
            let api = ApiClient::from_window(Some(session.token.clone()));
            match chats::fetch_chats(&api, session.user.id).await {
                Ok(summaries) => {
                    users.prefetch(&api, summaries.iter().map(|chat| chat.other_user_id));
                    Ok(summaries)
                }
                Err(err) => {
                    log!("Loading chats failed: {err}");
                    if err.is_auth() {
                        Session::clear();
                        set_session.set(None);
                    }
                    Err("Не удалось загрузить список чатов".to_owned())
                }
            }
        },
    );

    let on_logout = move || {
        Session::clear();
        set_session.set(None);
        set_selected.set(None);
    };

    view! {
        <div class="flex flex-row min-h-dvh bg-white dark:bg-gray-900">
            {move || {
                let Some(session_value) = session.get() else {
                    return view! { <Login on_login=move |session| set_session.set(Some(session)) /> }
                        .into_view();
                };
                let api = store_value(ApiClient::from_window(Some(session_value.token.clone())));
                let me = store_value(session_value.user.clone());
                view! {
                    <Suspense fallback=move || {
                        view! { <Loading label=String::from("Загрузка чатов...") /> }
                    }>
                        {move || {
                            load.get()
                                .map(|result| match result {
                                    Ok(summaries) => {
                                        let pane_api = api.get_value();
                                        let pane_me = me.get_value();
                                        let nav_chats = summaries.clone();
                                        view! {
                                            <Nav
                                                user=me.get_value()
                                                chats=nav_chats
                                                selected=selected
                                                on_select=move |chat_id| set_selected.set(Some(chat_id))
                                                on_logout=on_logout
                                                api=api.get_value()
                                                users=users
                                            />
                                            {move || {
                                                let open: Option<ChatSummary> = selected
                                                    .get()
                                                    .and_then(|chat_id| {
                                                        summaries.iter().find(|chat| chat.id == chat_id).cloned()
                                                    });
                                                match open {
                                                    Some(summary) => {
                                                        view! {
                                                            <Conversation
                                                                chat_id=summary.id
                                                                me=pane_me.clone()
                                                                summary=summary
                                                                api=pane_api.clone()
                                                                users=users
                                                            />
                                                        }
                                                            .into_view()
                                                    }
                                                    None => {
                                                        view! {
                                                            <div class="grow flex items-center justify-center text-gray-500 dark:text-gray-400">
                                                                <h2>"Выберите чат, чтобы начать общение"</h2>
                                                            </div>
                                                        }
                                                            .into_view()
                                                    }
                                                }
                                            }}
                                        }
                                            .into_view()
                                    }
                                    Err(message) => {
                                        view! {
                                            <div class="grow flex flex-col items-center justify-center gap-2">
                                                <p class="text-red-500">{message}</p>
                                                <button
                                                    class="px-4 py-2 text-sm text-white bg-gray-800 rounded-lg hover:bg-gray-900 dark:bg-gray-700 dark:hover:bg-gray-600"
                                                    on:click=move |_| set_reload.update(|count| *count += 1)
                                                >
                                                    "Попробовать снова"
                                                </button>
                                            </div>
                                        }
                                            .into_view()
                                    }
                                })
                        }}
                    </Suspense>
                }
                .into_view()
            }}
        </div>
    }
}
