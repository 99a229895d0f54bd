use leptos::*;

#[component]
pub fn Loading(#[prop(optional, into)] label: Option<String>) -> impl IntoView {
    let label = label.unwrap_or_else(|| "Загрузка...".to_owned());
    view! { <div class="p-6 text-center text-gray-500 dark:text-gray-400">{label}</div> }
}
