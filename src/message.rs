use leptos::*;

use crate::timeline::{format_time_msk, GroupedMessage};

const MY_AVATAR_PLACEHOLDER: &str = "https://via.placeholder.com/50?text=Me";
const OTHER_AVATAR_PLACEHOLDER: &str = "https://via.placeholder.com/50?text=U";

/// One chat bubble. Consecutive messages from the same sender drop the
/// avatar and name row and sit closer to their predecessor.
#[component]
pub fn MessageBubble(
    entry: GroupedMessage,
    is_me: bool,
    name: String,
    avatar: Option<String>,
) -> impl IntoView {
    let consecutive = entry.consecutive;
    let text = entry.message.text.clone();
    // Provisional entries have no confirmed server time yet.
    let clock = if entry.message.is_provisional() {
        "Отправка...".to_owned()
    } else {
        format_time_msk(entry.message.created_at)
    };
    let bubble_class = if is_me {
        "flex flex-col leading-1.5 p-3 rounded-e-xl rounded-es-xl bg-blue-100 dark:bg-blue-900"
    } else {
        "flex flex-col leading-1.5 p-3 rounded-e-xl rounded-es-xl bg-gray-100 dark:bg-gray-700"
    };
    let avatar = avatar.unwrap_or_else(|| {
        if is_me {
            MY_AVATAR_PLACEHOLDER.to_owned()
        } else {
            OTHER_AVATAR_PLACEHOLDER.to_owned()
        }
    });
    let alt = name.clone();

    view! {
        <div
            class="flex items-start gap-2.5"
            class:flex-row-reverse=move || is_me
            class:mt-4=move || !consecutive
            class:mt-1=move || consecutive
        >
            <img
                class="w-8 h-8 rounded-full"
                class:invisible=move || consecutive
                src=avatar
                alt=alt
            />
            <div class="flex flex-col gap-1 max-w-[75%]">
                {(!consecutive)
                    .then(|| {
                        view! {
                            <span class="text-sm font-semibold text-gray-900 dark:text-white">
                                {name}
                            </span>
                        }
                    })}
                <div class=bubble_class>
                    <p class="text-sm font-normal text-gray-900 dark:text-white">{text}</p>
                    <span class="text-xs font-normal text-gray-500 dark:text-gray-400 self-end">
                        {clock}
                    </span>
                </div>
            </div>
        </div>
    }
}
