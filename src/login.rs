use leptos::ev::SubmitEvent;
use leptos::logging::log;
use leptos::*;
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError};
use crate::session::Session;
use crate::state::UserProfile;

#[derive(Serialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct Verify2faBody {
    email: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    /// Dev servers echo the emailed verification code back.
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    token: String,
}

async fn request_code(api: &ApiClient, email: &str, password: &str) -> Result<LoginReply, ApiError> {
    api.post_json(
        "/auth/login",
        &LoginBody {
            email: email.to_owned(),
            password: password.to_owned(),
        },
    )
    .await
}

/// Exchanges the verification code for a token, then resolves the profile
/// the token belongs to.
async fn verify_code(api: &ApiClient, email: &str, code: &str) -> Result<Session, ApiError> {
    let reply: TokenReply = api
        .post_json(
            "/auth/verify-2fa",
            &Verify2faBody {
                email: email.to_owned(),
                code: code.to_owned(),
            },
        )
        .await?;
    let authed = ApiClient::from_window(Some(reply.token.clone()));
    let user: UserProfile = authed.get_json("/api/profile").await?;
    Ok(Session {
        token: reply.token,
        user,
    })
}

/// Two-step sign-in: credentials first, then the emailed verification code.
#[component]
pub fn Login<T>(on_login: T) -> impl IntoView
where
    T: Fn(Session) + 'static + Clone,
{
    let (email, set_email) = create_signal(String::new());
    let (password, set_password) = create_signal(String::new());
    let (code, set_code) = create_signal(String::new());
    let (awaiting_code, set_awaiting_code) = create_signal(false);
    let (busy, set_busy) = create_signal(false);
    let (error, set_error) = create_signal(None::<String>);

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        if busy.get_untracked() {
            return;
        }
        let api = ApiClient::from_window(None);
        let email_value = email.get_untracked();
        set_busy.set(true);
        set_error.set(None);
        if awaiting_code.get_untracked() {
            let code_value = code.get_untracked();
            let on_login = on_login.clone();
            spawn_local(async move {
                match verify_code(&api, &email_value, &code_value).await {
                    Ok(session) => {
                        session.store();
                        on_login(session);
                    }
                    Err(err) => {
                        log!("2FA verification failed: {err}");
                        set_error.set(Some("Неверный код подтверждения".to_owned()));
                    }
                }
                set_busy.set(false);
            });
        } else {
            let password_value = password.get_untracked();
            spawn_local(async move {
                match request_code(&api, &email_value, &password_value).await {
                    Ok(reply) => {
                        if let Some(code) = reply.code {
                            log!("2FA code: {code}");
                        }
                        set_awaiting_code.set(true);
                    }
                    Err(err) => {
                        log!("Login failed: {err}");
                        set_error.set(Some("Неверная почта или пароль".to_owned()));
                    }
                }
                set_busy.set(false);
            });
        }
    };

    let field_class = "block w-full p-2.5 text-sm text-gray-900 bg-white rounded-lg border \
                       border-gray-300 dark:bg-gray-800 dark:border-gray-600 dark:text-white";

    view! {
        <div class="flex items-center justify-center w-full h-screen bg-gray-50 dark:bg-gray-900">
            <form class="w-80 flex flex-col gap-3" on:submit=submit>
                <h1 class="text-xl font-semibold text-gray-900 dark:text-white">"Вход"</h1>
                {move || {
                    if awaiting_code.get() {
                        view! {
                            <p class="text-sm text-gray-500 dark:text-gray-400">
                                "Мы отправили код подтверждения на вашу почту"
                            </p>
                            <input
                                class=field_class
                                placeholder="Код из письма"
                                prop:value=code
                                on:input=move |ev| set_code.set(event_target_value(&ev))
                            />
                        }
                            .into_view()
                    } else {
                        view! {
                            <input
                                class=field_class
                                type="email"
                                placeholder="Почта"
                                prop:value=email
                                on:input=move |ev| set_email.set(event_target_value(&ev))
                            />
                            <input
                                class=field_class
                                type="password"
                                placeholder="Пароль"
                                prop:value=password
                                on:input=move |ev| set_password.set(event_target_value(&ev))
                            />
                        }
                            .into_view()
                    }
                }}
                {move || {
                    error
                        .get()
                        .map(|message| view! { <p class="text-sm text-red-500">{message}</p> })
                }}
                <button
                    type="submit"
                    class="px-5 py-2.5 text-sm font-medium text-white bg-blue-700 rounded-lg \
                           hover:bg-blue-800 dark:bg-blue-600 dark:hover:bg-blue-700"
                    disabled=move || busy.get()
                >
                    {move || {
                        if busy.get() {
                            "Подождите..."
                        } else if awaiting_code.get() {
                            "Подтвердить"
                        } else {
                            "Войти"
                        }
                    }}
                </button>
            </form>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_reply_code_is_optional() {
        let with_code: LoginReply =
            serde_json::from_str(r#"{"message":"ok","code":"123456"}"#).expect("with code");
        let without: LoginReply = serde_json::from_str(r#"{"message":"ok"}"#).expect("without");
        assert_eq!(with_code.code.as_deref(), Some("123456"));
        assert!(without.code.is_none());
    }

    #[test]
    fn token_reply_requires_the_token() {
        assert!(serde_json::from_str::<TokenReply>(r#"{"token":"abc"}"#).is_ok());
        assert!(serde_json::from_str::<TokenReply>(r#"{}"#).is_err());
    }
}
