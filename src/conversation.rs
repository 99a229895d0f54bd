use chrono::{DateTime, Utc};
use leptos::ev::SubmitEvent;
use leptos::logging::error;
use leptos::*;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::chats::{self, RawMessage};
use crate::loading::Loading;
use crate::message::MessageBubble;
use crate::state::{ChatSummary, Message, UserProfile};
use crate::timeline::{date_label_today, group_by_day};
use crate::users::UserDirectory;

/// Bookkeeping for one in-flight send, keyed by the provisional entry's
/// temporary id.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub temp_id: i64,
    pub text: String,
}

/// The authoritative in-memory message list for one open conversation.
///
/// Provisional entries use negative ids handed out by `begin_send`, a space
/// disjoint from the server's positive ids. Each one is resolved exactly
/// once, by `commit_send` or `rollback_send`; overlapping sends track their
/// own ids and settle independently.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_provisional_id: i64,
}

impl MessageLog {
    pub fn new(messages: Vec<Message>) -> Self {
        MessageLog {
            messages,
            next_provisional_id: -1,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a provisional entry for `text`, or does nothing when the
    /// trimmed text is empty (no entry, no network call).
    pub fn begin_send(
        &mut self,
        chat_id: i64,
        sender_id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<PendingSend> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let temp_id = self.next_provisional_id;
        self.next_provisional_id -= 1;
        self.messages.push(Message {
            id: temp_id,
            chat_id,
            sender_id,
            text: trimmed.to_owned(),
            created_at: now,
        });
        Some(PendingSend {
            temp_id,
            text: trimmed.to_owned(),
        })
    }

    /// The send settled successfully: the provisional entry is replaced by
    /// the confirmed one, defaulting whatever the server omitted from it.
    /// A reply whose provisional entry is gone (dropped by a reload) is
    /// discarded rather than appended twice; the next fetch carries it.
    pub fn commit_send(&mut self, temp_id: i64, reply: &RawMessage) {
        let Some(provisional) = self.take(temp_id) else {
            return;
        };
        let confirmed = Message {
            id: reply.id.unwrap_or(provisional.id),
            chat_id: provisional.chat_id,
            sender_id: reply.sender_id.unwrap_or(provisional.sender_id),
            text: reply
                .content
                .clone()
                .unwrap_or_else(|| provisional.text.clone()),
            created_at: reply.timestamp().unwrap_or(provisional.created_at),
        };
        if self.messages.iter().any(|message| message.id == confirmed.id) {
            return;
        }
        self.messages.push(confirmed);
    }

    /// The send failed: the provisional entry is removed outright.
    pub fn rollback_send(&mut self, temp_id: i64) {
        self.take(temp_id);
    }

    fn take(&mut self, id: i64) -> Option<Message> {
        let index = self
            .messages
            .iter()
            .position(|message| message.id == id)?;
        Some(self.messages.remove(index))
    }
}

#[component]
pub fn Conversation(
    chat_id: i64,
    me: UserProfile,
    summary: ChatSummary,
    api: ApiClient,
    users: UserDirectory,
) -> impl IntoView {
    let me_id = me.id;
    let me_name = store_value(me.name.clone());
    let me_avatar = store_value(me.avatar.clone());
    let other_id = summary.other_user_id;
    let other_name = store_value(summary.other_user_name.clone());

    let (reload, set_reload) = create_signal(0u32);
    let (draft, set_draft) = create_signal(String::new());
    let (send_error, set_send_error) = create_signal(None::<String>);

    let load_api = api.clone();
    let messages = create_resource(
        move || reload.get(),
        move |_| {
            let api = load_api.clone();
            async move {
                match chats::fetch_messages(&api, chat_id).await {
                    Ok(list) => {
                        let senders: Vec<i64> = list
                            .iter()
                            .map(|message| message.sender_id)
                            .filter(|sender| *sender != me_id)
                            .collect();
                        users.prefetch(&api, senders);
                        Ok(MessageLog::new(list))
                    }
                    Err(err) => {
                        error!("Loading messages for chat {chat_id} failed: {err}");
                        Err("Не удалось загрузить сообщения".to_owned())
                    }
                }
            }
        },
    );

    let send_api = api.clone();
    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let text = draft.get_untracked();
        let mut pending = None;
        messages.update(|loaded| {
            if let Some(Ok(log)) = loaded {
                pending = log.begin_send(chat_id, me_id, &text, Utc::now());
            }
        });
        let Some(send) = pending else {
            return;
        };
        set_draft.set(String::new());
        set_send_error.set(None);
        let api = send_api.clone();
        spawn_local(async move {
            match chats::send_message(&api, chat_id, &send.text).await {
                Ok(reply) => messages.update(|loaded| {
                    if let Some(Ok(log)) = loaded {
                        log.commit_send(send.temp_id, &reply);
                    }
                }),
                Err(err) => {
                    error!("Sending to chat {chat_id} failed: {err}");
                    messages.update(|loaded| {
                        if let Some(Ok(log)) = loaded {
                            log.rollback_send(send.temp_id);
                        }
                    });
                    set_send_error.set(Some("Не удалось отправить сообщение".to_owned()));
                }
            }
        });
    };

    let header_name =
        move || users.name_of(other_id).unwrap_or_else(|| other_name.get_value());

    let render_api = store_value(api.clone());
    let body = move || {
        messages.get().map(|result| match result {
            Ok(log) => {
                if log.is_empty() {
                    return view! {
                        <div class="text-center text-gray-500 dark:text-gray-400 my-8">
                            <p>"Нет сообщений"</p>
                            <p>"Отправьте сообщение, чтобы начать диалог"</p>
                        </div>
                    }
                    .into_view();
                }
                group_by_day(log.messages())
                    .into_iter()
                    .map(|group| {
                        let label = date_label_today(group.date);
                        let bubbles = group
                            .messages
                            .into_iter()
                            .map(|entry| {
                                let sender = entry.message.sender_id;
                                let is_me = sender == me_id;
                                let name = if is_me {
                                    me_name.get_value()
                                } else {
                                    users.name_of(sender).unwrap_or_else(|| other_name.get_value())
                                };
                                let avatar = (if is_me {
                                    me_avatar.get_value()
                                } else {
                                    users.avatar_of(sender)
                                })
                                .map(|path| render_api.get_value().full_image_url(&path));
                                view! { <MessageBubble entry is_me name avatar /> }
                            })
                            .collect_view();
                        view! {
                            <div>
                                <div class="text-center text-xs text-gray-500 dark:text-gray-400 my-3">
                                    <span>{label}</span>
                                </div>
                                {bubbles}
                            </div>
                        }
                    })
                    .collect_view()
            }
            Err(message) => view! {
                <div class="text-center my-8">
                    <p class="text-red-500">{message}</p>
                    <button
                        class="mt-2 px-4 py-2 text-sm text-white bg-gray-800 rounded-lg hover:bg-gray-900 dark:bg-gray-700 dark:hover:bg-gray-600"
                        on:click=move |_| set_reload.update(|count| *count += 1)
                    >
                        "Попробовать снова"
                    </button>
                </div>
            }
            .into_view(),
        })
    };

    let listing = {
        let title = summary.listing_title.clone();
        let image = summary
            .listing_image
            .clone()
            .map(|path| api.full_image_url(&path));
        let thumb = image.map(|src| {
            view! { <img class="w-8 h-8 rounded object-cover" src=src alt=title.clone() /> }
        });
        match summary.listing_id {
            Some(listing_id) => view! {
                <a
                    class="flex items-center gap-2 ms-auto text-sm text-gray-500 dark:text-gray-400 hover:underline"
                    href=format!("/listings/{listing_id}")
                >
                    {thumb}
                    <span>{title}</span>
                </a>
            }
            .into_view(),
            None => view! {
                <span class="ms-auto text-sm text-gray-500 dark:text-gray-400">{title}</span>
            }
            .into_view(),
        }
    };

    view! {
        <div class="grow flex flex-col h-dvh max-h-dvh">
            <div class="flex items-center gap-3 p-4 border-b dark:border-gray-800">
                <h2 class="font-semibold text-gray-900 dark:text-white">{header_name}</h2>
                {listing}
            </div>
            <main class="grow flex flex-col overflow-y-auto p-4">
                <Suspense fallback=move || {
                    view! { <Loading label=String::from("Загрузка сообщений...") /> }
                }>{body}</Suspense>
            </main>
            <form class="w-full" on:submit=on_submit>
                {move || {
                    send_error
                        .get()
                        .map(|message| view! { <p class="text-sm text-red-500 px-4 pt-2">{message}</p> })
                }}
                <div class="flex items-center gap-2 px-4 py-3 border-t dark:border-gray-800">
                    <input
                        class="block w-full p-2.5 text-sm text-gray-900 bg-white rounded-lg border border-gray-300 dark:bg-gray-800 dark:border-gray-600 dark:placeholder-gray-400 dark:text-white"
                        placeholder="Напишите сообщение..."
                        prop:value=draft
                        on:input=move |ev| set_draft.set(event_target_value(&ev))
                    />
                    <button
                        type="submit"
                        class="px-4 py-2 text-sm font-medium text-white bg-blue-700 rounded-lg hover:bg-blue-800 dark:bg-blue-600 dark:hover:bg-blue-700"
                    >
                        "Отправить"
                    </button>
                </div>
            </form>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_log() -> MessageLog {
        MessageLog::new(vec![
            Message {
                id: 1,
                chat_id: 5,
                sender_id: 42,
                text: "Здравствуйте, диван ещё продаётся?".to_owned(),
                created_at: "2024-01-01T10:00:00Z".parse().expect("timestamp"),
            },
            Message {
                id: 2,
                chat_id: 5,
                sender_id: 7,
                text: "Да, продаётся".to_owned(),
                created_at: "2024-01-01T10:05:00Z".parse().expect("timestamp"),
            },
        ])
    }

    fn now() -> DateTime<Utc> {
        "2024-01-02T09:00:00Z".parse().expect("timestamp")
    }

    #[test]
    fn blank_text_is_a_no_op() {
        let mut log = loaded_log();
        let before = log.messages().to_vec();
        assert!(log.begin_send(5, 7, "", now()).is_none());
        assert!(log.begin_send(5, 7, "   \n\t", now()).is_none());
        assert_eq!(log.messages(), before.as_slice());
    }

    #[test]
    fn begin_send_appends_a_trimmed_provisional_entry() {
        let mut log = loaded_log();
        let send = log.begin_send(5, 7, "  Когда можно посмотреть?  ", now()).expect("pending");
        assert_eq!(send.text, "Когда можно посмотреть?");
        let last = log.messages().last().expect("appended");
        assert!(last.is_provisional());
        assert_eq!(last.id, send.temp_id);
        assert_eq!(last.sender_id, 7);
        assert_eq!(last.chat_id, 5);
        assert_eq!(last.text, "Когда можно посмотреть?");
    }

    #[test]
    fn commit_replaces_the_provisional_entry_exactly_once() {
        let mut log = loaded_log();
        let before = log.messages().len();
        let send = log.begin_send(5, 7, "Когда можно посмотреть?", now()).expect("pending");
        let reply = RawMessage {
            id: Some(10),
            sender_id: Some(7),
            content: Some("Когда можно посмотреть?".to_owned()),
            created_at: Some("2024-01-02T09:00:01Z".to_owned()),
        };
        log.commit_send(send.temp_id, &reply);

        assert_eq!(log.messages().len(), before + 1);
        assert!(log.messages().iter().all(|message| !message.is_provisional()));
        assert_eq!(log.messages().last().expect("confirmed").id, 10);
    }

    #[test]
    fn commit_defaults_omitted_fields_from_the_provisional_entry() {
        let mut log = loaded_log();
        let send = log.begin_send(5, 7, "Хорошо", now()).expect("pending");
        let reply = RawMessage {
            id: Some(10),
            ..Default::default()
        };
        log.commit_send(send.temp_id, &reply);

        let confirmed = log.messages().last().expect("confirmed");
        assert_eq!(confirmed.id, 10);
        assert_eq!(confirmed.chat_id, 5);
        assert_eq!(confirmed.sender_id, 7);
        assert_eq!(confirmed.text, "Хорошо");
        assert_eq!(confirmed.created_at, now());
    }

    #[test]
    fn rollback_restores_the_pre_send_contents() {
        let mut log = loaded_log();
        let before = log.messages().to_vec();
        let send = log.begin_send(5, 7, "Хорошо", now()).expect("pending");
        log.rollback_send(send.temp_id);
        assert_eq!(log.messages(), before.as_slice());
    }

    #[test]
    fn overlapping_sends_settle_independently() {
        let mut log = loaded_log();
        let first = log.begin_send(5, 7, "Первое", now()).expect("pending");
        let second = log.begin_send(5, 7, "Второе", now()).expect("pending");
        assert_ne!(first.temp_id, second.temp_id);

        // The second send fails while the first is still in flight.
        log.rollback_send(second.temp_id);
        let reply = RawMessage {
            id: Some(10),
            ..Default::default()
        };
        log.commit_send(first.temp_id, &reply);

        let texts: Vec<&str> = log
            .messages()
            .iter()
            .map(|message| message.text.as_str())
            .collect();
        assert!(texts.contains(&"Первое"));
        assert!(!texts.contains(&"Второе"));
        assert!(log.messages().iter().all(|message| !message.is_provisional()));
    }

    #[test]
    fn a_reply_for_a_dropped_provisional_entry_is_discarded() {
        // Navigation replaced the log while the send was in flight; the
        // reply must not be appended to the new list.
        let mut log = loaded_log();
        let before = log.messages().to_vec();
        let reply = RawMessage {
            id: Some(10),
            ..Default::default()
        };
        log.commit_send(-1, &reply);
        assert_eq!(log.messages(), before.as_slice());
    }

    #[test]
    fn commit_never_introduces_a_duplicate_id() {
        let mut log = loaded_log();
        let send = log.begin_send(5, 7, "Ещё раз", now()).expect("pending");
        // The server answers with an id the list already holds.
        let reply = RawMessage {
            id: Some(2),
            ..Default::default()
        };
        log.commit_send(send.temp_id, &reply);

        let count = log.messages().iter().filter(|message| message.id == 2).count();
        assert_eq!(count, 1);
        assert!(log.messages().iter().all(|message| !message.is_provisional()));
    }
}
