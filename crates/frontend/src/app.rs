use crate::routes::routes::AppRoutes;
use crate::system::session::Session;
use leptos::prelude::*;

#[component]
pub fn App() -> impl IntoView {
    // Сессия (токен из localStorage) для всех запросов к API
    provide_context(Session::restore());

    view! {
        <AppRoutes />
    }
}
