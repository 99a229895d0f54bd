use leptos::ev::MouseEvent;
use leptos::*;

use crate::api::ApiClient;
use crate::state::{ChatSummary, UserProfile};
use crate::timeline::format_time_msk;
use crate::users::UserDirectory;

const AVATAR_PLACEHOLDER: &str = "https://via.placeholder.com/50?text=U";

/// Conversation list sidebar: the other participant, the listing and the
/// last-message snippet for every chat of the signed-in user.
#[component]
pub fn Nav<T, U>(
    user: UserProfile,
    chats: Vec<ChatSummary>,
    selected: ReadSignal<Option<i64>>,
    on_select: T,
    on_logout: U,
    api: ApiClient,
    users: UserDirectory,
) -> impl IntoView
where
    T: Fn(i64) + 'static + Clone,
    U: Fn() + 'static + Clone,
{
    let is_empty = chats.is_empty();
    let my_name = match &user.last_name {
        Some(last_name) => format!("{} {}", user.name, last_name),
        None => user.name.clone(),
    };
    let my_avatar = user
        .avatar
        .as_deref()
        .map(|path| api.full_image_url(path))
        .unwrap_or_else(|| "https://via.placeholder.com/50?text=Me".to_owned());
    view! {
        <div class="lg:w-1/4 w-full flex flex-col border-e-2 dark:border-gray-800 min-h-dvh max-h-dvh overflow-y-auto">
            <div class="flex items-center gap-3 p-4">
                <img class="w-10 h-10 rounded-full" src=my_avatar alt=my_name.clone() />
                <h2 class="grow text-base font-semibold text-gray-500 uppercase dark:text-gray-400">
                    {my_name}
                </h2>
                <button
                    class="text-sm text-gray-500 hover:text-gray-900 dark:text-gray-400 dark:hover:text-white"
                    on:click={
                        let on_logout = on_logout.clone();
                        move |_| on_logout()
                    }
                >
                    "Выйти"
                </button>
            </div>
            <h3 class="px-4 pb-2 text-sm font-semibold text-gray-900 dark:text-white">
                "Сообщения"
            </h3>
            {if is_empty {
                view! {
                    <div class="p-4 text-center text-gray-500 dark:text-gray-400">
                        <p>"У вас пока нет сообщений"</p>
                        <a class="text-blue-600 dark:text-blue-400 hover:underline" href="/catalog">
                            "Найти что-нибудь интересное"
                        </a>
                    </div>
                }
                    .into_view()
            } else {
                let items = chats
                    .into_iter()
                    .map(|chat| {
                        let chat_id = chat.id;
                        let fallback_name = chat.other_user_name.clone();
                        let other_id = chat.other_user_id;
                        let snippet = chat.last_message.clone();
                        let time = chat.last_message_at.map(format_time_msk);
                        let item_api = api.clone();
                        let on_select = on_select.clone();
                        let onclick = move |ev: MouseEvent| {
                            ev.prevent_default();
                            on_select(chat_id);
                        };
                        let name = move || {
                            users.name_of(other_id).unwrap_or_else(|| fallback_name.clone())
                        };
                        let avatar = move || {
                            users
                                .avatar_of(other_id)
                                .map(|path| item_api.full_image_url(&path))
                                .unwrap_or_else(|| AVATAR_PLACEHOLDER.to_owned())
                        };
                        view! {
                            <li on:click=onclick>
                                <a
                                    href="#"
                                    class="flex items-center gap-3 p-3 text-gray-900 rounded-lg dark:text-white hover:bg-gray-100 dark:hover:bg-gray-700"
                                    class:bg-gray-100=move || selected.get() == Some(chat_id)
                                    class=("dark:bg-gray-700", move || selected.get() == Some(chat_id))
                                >
                                    <img class="w-10 h-10 rounded-full" src=avatar alt="avatar" />
                                    <div class="grow min-w-0 text-left">
                                        <h3 class="text-sm font-semibold truncate">{name}</h3>
                                        <p class="text-sm text-gray-500 dark:text-gray-400 truncate">
                                            {snippet}
                                        </p>
                                    </div>
                                    {time
                                        .map(|time| {
                                            view! {
                                                <span class="text-xs text-gray-500 dark:text-gray-400">
                                                    {time}
                                                </span>
                                            }
                                        })}
                                </a>
                            </li>
                        }
                    })
                    .collect_view();
                view! { <ul class="space-y-1 font-medium px-2 pb-4">{items}</ul> }.into_view()
            }}
        </div>
    }
}
