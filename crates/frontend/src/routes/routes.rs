use crate::projections::p910_order_payment_merge::ui::list::DataMergeList;
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
fn NotFound() -> impl IntoView {
    view! {
        <div style="padding: 24px;">
            <h2>"Страница не найдена"</h2>
            <a href="/">"Data Merge"</a>
        </div>
    }
}

#[component]
pub fn AppRoutes() -> impl IntoView {
    view! {
        <Router>
            <main style="padding: 12px;">
                <Routes fallback=|| view! { <NotFound /> }>
                    <Route path=path!("/") view=DataMergeList />
                    <Route path=path!("/data-merge") view=DataMergeList />
                </Routes>
            </main>
        </Router>
    }
}
