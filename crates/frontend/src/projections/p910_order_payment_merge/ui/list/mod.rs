pub mod state;

use contracts::enums::StatusSource;
use contracts::projections::p910_order_payment_merge::statistics::UNKNOWN_KEY;
use contracts::projections::p910_order_payment_merge::{
    status_tone, MergeStatistics, MergedOrderRecordDto,
};
use contracts::shared::period::{parse_iso_date, Aggregation, TimeSeriesPoint};
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;

use self::state::{create_state, default_chart_period, page_label};
use crate::projections::p910_order_payment_merge::api::{
    self, GlooTransport, MergeQueryClient, MergedPage,
};
use crate::shared::api_utils::api_base;
use crate::shared::diagnostics::ServerDiagnostics;
use crate::shared::request_guard::RequestSequencer;
use crate::system::session::Session;

const SEARCH_DEBOUNCE_MS: u32 = 300;

fn query_client(session: &Session) -> MergeQueryClient<GlooTransport, ServerDiagnostics> {
    MergeQueryClient::new(api_base(), GlooTransport, session.clone(), ServerDiagnostics)
}

fn use_session() -> Session {
    use_context::<Session>().unwrap_or_else(Session::restore)
}

fn fmt_amount(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn fmt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn fmt_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Сигналы для кнопок импорта и пересборки
#[derive(Clone, Copy)]
struct ActionSignals {
    set_busy: WriteSignal<bool>,
    set_message: WriteSignal<Option<String>>,
    set_error: WriteSignal<Option<String>>,
    set_reload: WriteSignal<u32>,
}

impl ActionSignals {
    fn start(&self) {
        self.set_busy.set(true);
        self.set_message.set(None);
        self.set_error.set(None);
    }

    fn finish(&self, result: Result<String, String>) {
        match result {
            Ok(message) => {
                self.set_message.set(Some(message));
                self.set_reload.update(|v| *v += 1);
            }
            Err(e) => self.set_error.set(Some(e)),
        }
        self.set_busy.set(false);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ImportKind {
    Orders,
    Payments,
}

impl ImportKind {
    fn label(&self) -> &'static str {
        match self {
            ImportKind::Orders => "orders",
            ImportKind::Payments => "payments",
        }
    }
}

fn selected_file(ev: &leptos::ev::Event) -> Option<web_sys::File> {
    let input = ev
        .target()?
        .dyn_into::<web_sys::HtmlInputElement>()
        .ok()?;
    input.files()?.get(0)
}

async fn read_file_text(file: web_sys::File) -> Result<String, String> {
    let value = wasm_bindgen_futures::JsFuture::from(file.text())
        .await
        .map_err(|e| format!("Failed to read file: {:?}", e))?;
    value
        .as_string()
        .ok_or_else(|| "File content is not text".to_string())
}

async fn import_file(session: Session, kind: ImportKind, file: web_sys::File) -> Result<String, String> {
    let csv = read_file_text(file).await?;
    let response = match kind {
        ImportKind::Orders => api::import_orders(&session, csv).await?,
        ImportKind::Payments => api::import_payments(&session, csv).await?,
    };
    Ok(format!(
        "Imported {} {} rows ({} skipped), merged table has {} records",
        response.imported,
        kind.label(),
        response.skipped,
        response.merged_records
    ))
}

#[component]
pub fn DataMergeList() -> impl IntoView {
    let session = use_session();
    let state = create_state();

    let (page_data, set_page_data) = signal(MergedPage::empty());
    let (stats, set_stats) = signal(MergeStatistics::default());
    let (loading, set_loading) = signal(false);
    let (search_input, set_search_input) = signal(String::new());
    let (reload, set_reload) = signal(0u32);

    let (busy, set_busy) = signal(false);
    let (action_message, set_message) = signal(None::<String>);
    let (action_error, set_error) = signal(None::<String>);
    let actions = ActionSignals {
        set_busy,
        set_message,
        set_error,
        set_reload,
    };

    // Загрузка страницы: применяется ответ только последнего запроса
    let page_sequencer = RequestSequencer::new();
    {
        let session = session.clone();
        Effect::new(move |_| {
            let st = state.get();
            reload.track();

            let ticket = page_sequencer.issue();
            let sequencer = page_sequencer.clone();
            let client = query_client(&session);
            set_loading.set(true);

            spawn_local(async move {
                let page = client
                    .fetch_page(
                        st.page,
                        st.page_size,
                        Some(&st.search),
                        Some(&st.status_filter),
                        Some(&st.source_filter),
                    )
                    .await;
                if sequencer.is_current(ticket) {
                    set_page_data.set(page);
                    set_loading.set(false);
                }
            });
        });
    }

    let stats_sequencer = RequestSequencer::new();
    {
        let session = session.clone();
        Effect::new(move |_| {
            reload.track();

            let ticket = stats_sequencer.issue();
            let sequencer = stats_sequencer.clone();
            let client = query_client(&session);

            spawn_local(async move {
                let result = client.fetch_statistics().await;
                if sequencer.is_current(ticket) {
                    set_stats.set(result);
                }
            });
        });
    }

    let search_debounce = RequestSequencer::new();
    let on_search_input = move |ev| {
        let value = event_target_value(&ev);
        set_search_input.set(value.clone());

        let ticket = search_debounce.issue();
        let debounce = search_debounce.clone();
        spawn_local(async move {
            gloo_timers::future::TimeoutFuture::new(SEARCH_DEBOUNCE_MS).await;
            if debounce.is_current(ticket) {
                state.update(|s| {
                    s.search = value;
                    s.page = 0;
                });
            }
        });
    };

    let clear_filters = move |_| {
        set_search_input.set(String::new());
        state.update(|s| {
            s.search.clear();
            s.status_filter.clear();
            s.source_filter.clear();
            s.page = 0;
        });
    };

    let on_rebuild = {
        let session = session.clone();
        move |_| {
            let session = session.clone();
            actions.start();
            spawn_local(async move {
                let result = api::rebuild(&session).await.map(|r| r.message);
                actions.finish(result);
            });
        }
    };

    let on_import = move |kind: ImportKind| {
        let session = session.clone();
        move |ev: leptos::ev::Event| {
            let Some(file) = selected_file(&ev) else {
                return;
            };
            let session = session.clone();
            actions.start();
            spawn_local(async move {
                actions.finish(import_file(session, kind, file).await);
            });
        }
    };
    let on_import_orders = on_import(ImportKind::Orders);
    let on_import_payments = on_import(ImportKind::Payments);

    let total_pages = move || state.get().total_pages(page_data.get().total_records);

    view! {
        <div class="data-merge-list">
            <div style="display: flex; align-items: center; gap: 12px; margin-bottom: 12px;">
                <h2 style="margin: 0; font-size: var(--font-size-h3); line-height: 1.2;">"Data Merge (P910)"</h2>

                <label class="button-like" style="font-size: var(--font-size-sm);">
                    "Orders CSV "
                    <input type="file" accept=".csv,text/csv" on:change=on_import_orders prop:disabled=busy />
                </label>
                <label class="button-like" style="font-size: var(--font-size-sm);">
                    "Payments CSV "
                    <input type="file" accept=".csv,text/csv" on:change=on_import_payments prop:disabled=busy />
                </label>
                <button
                    on:click=on_rebuild
                    prop:disabled=busy
                    style="padding: 4px 12px; background: #4CAF50; color: white; border: none; border-radius: 4px; cursor: pointer; font-size: var(--font-size-sm);"
                >
                    "Пересобрать"
                </button>
                <a
                    href={api::export_url()}
                    style="font-size: var(--font-size-sm);"
                >
                    "Export CSV"
                </a>
            </div>

            {move || action_message.get().map(|msg| view! {
                <div style="padding: 8px; margin-bottom: 8px; background: #e8f5e9; border: 1px solid #66bb6a; border-radius: 4px;">{msg}</div>
            })}
            {move || action_error.get().map(|err| view! {
                <div style="padding: 8px; margin-bottom: 8px; background: #ffebee; border: 1px solid #ef5350; border-radius: 4px; color: #c62828;">{err}</div>
            })}

            <StatisticsCards stats=stats />

            <div style="display: flex; align-items: center; gap: 12px; margin: 12px 0;">
                <input
                    type="text"
                    placeholder="Search order id, SKU or status"
                    prop:value=search_input
                    on:input=on_search_input
                    style="padding: 4px 8px; border: 1px solid var(--color-border-light); border-radius: 4px; font-size: var(--font-size-sm); min-width: 260px;"
                />

                <label style="margin: 0; font-size: var(--font-size-sm); white-space: nowrap;">"Status:"</label>
                <select
                    prop:value=move || state.get().status_filter
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        state.update(|s| {
                            s.status_filter = value;
                            s.page = 0;
                        });
                    }
                    style="padding: 4px 8px; border: 1px solid var(--color-border-light); border-radius: 4px; font-size: var(--font-size-sm);"
                >
                    <option value="">"All"</option>
                    {move || {
                        stats
                            .get()
                            .final_status_breakdown
                            .into_keys()
                            .filter(|status| status != UNKNOWN_KEY)
                            .map(|status| view! { <option value={status.clone()}>{status.clone()}</option> })
                            .collect_view()
                    }}
                </select>

                <label style="margin: 0; font-size: var(--font-size-sm); white-space: nowrap;">"Source:"</label>
                <select
                    prop:value=move || state.get().source_filter
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        state.update(|s| {
                            s.source_filter = value;
                            s.page = 0;
                        });
                    }
                    style="padding: 4px 8px; border: 1px solid var(--color-border-light); border-radius: 4px; font-size: var(--font-size-sm);"
                >
                    <option value="">"All"</option>
                    {StatusSource::all()
                        .into_iter()
                        .map(|source| view! {
                            <option value={source.code().to_string()}>{source.display_name().to_string()}</option>
                        })
                        .collect_view()}
                </select>

                <button
                    on:click=clear_filters
                    style="padding: 4px 12px; border: 1px solid var(--color-border-light); border-radius: 4px; cursor: pointer; font-size: var(--font-size-sm);"
                >
                    "Сбросить"
                </button>

                {move || if loading.get() {
                    view! { <span style="font-size: var(--font-size-sm);">"Loading..."</span> }.into_any()
                } else {
                    view! {
                        <span style="font-size: var(--font-size-sm); color: var(--color-text-muted);">
                            "Total: " {page_data.get().total_records} " records"
                        </span>
                    }.into_any()
                }}
            </div>

            <div style="overflow-y: auto; max-height: calc(100vh - 360px); border: 1px solid #ddd;">
                <table class="data-table" style="width: 100%; border-collapse: collapse; margin: 0;">
                    <thead style="position: sticky; top: 0; z-index: 10; background: #f5f5f5;">
                        <tr>
                            <th>"Order ID"</th>
                            <th>"SKU"</th>
                            <th>"Product"</th>
                            <th>"Qty"</th>
                            <th>"Selling Price"</th>
                            <th>"Final Status"</th>
                            <th>"Source"</th>
                            <th>"Payment ID"</th>
                            <th>"Amount"</th>
                            <th>"Settlement"</th>
                            <th>"Order Date"</th>
                            <th>"Payment Date"</th>
                        </tr>
                    </thead>
                    <tbody>
                        {move || {
                            let records = page_data.get().records;
                            if records.is_empty() {
                                view! {
                                    <tr>
                                        <td colspan="12" style="padding: 16px; text-align: center; color: var(--color-text-muted);">
                                            "No merged records"
                                        </td>
                                    </tr>
                                }.into_any()
                            } else {
                                records.into_iter().map(record_row).collect_view().into_any()
                            }
                        }}
                    </tbody>
                </table>
            </div>

            <div style="display: flex; align-items: center; gap: 8px; margin-top: 8px; font-size: var(--font-size-sm);">
                {move || {
                    let st = state.get();
                    if st.has_filter() {
                        view! { <span>"Filtered: all " {page_data.get().records.len()} " records on one page"</span> }.into_any()
                    } else {
                        let pages = total_pages();
                        // Номер страницы берём из ответа: сервер клампит страницу за концом
                        let current = page_data.get().current_page;
                        view! {
                            <button
                                prop:disabled={current == 0}
                                on:click=move |_| state.update(|s| s.page = current.saturating_sub(1))
                            >
                                "‹ Prev"
                            </button>
                            <span>{page_label(current, pages)}</span>
                            <button
                                prop:disabled={current + 1 >= pages}
                                on:click=move |_| state.update(|s| s.page = current + 1)
                            >
                                "Next ›"
                            </button>
                        }.into_any()
                    }
                }}
            </div>

            <OrdersByTimePanel reload=reload />
        </div>
    }
}

fn record_row(record: MergedOrderRecordDto) -> impl IntoView {
    let badge = status_tone(record.final_status.as_deref()).badge_class();
    let source = record
        .status_source
        .as_ref()
        .map(|s| s.display_name().to_string())
        .unwrap_or_else(|| "-".to_string());
    let order_date = record.order_date().unwrap_or("-").to_string();
    let sku_style = if record.has_sku() { "" } else { "color: #c62828;" };

    view! {
        <tr>
            <td>{record.order_id.clone()}</td>
            <td style=sku_style>{fmt_text(&record.sku)}</td>
            <td>{fmt_text(&record.product_name)}</td>
            <td style="text-align: right;">{record.quantity.map(|q| q.to_string()).unwrap_or_default()}</td>
            <td style="text-align: right;">{fmt_amount(record.selling_price)}</td>
            <td><span class=badge>{fmt_text(&record.final_status)}</span></td>
            <td>{source}</td>
            <td>{fmt_text(&record.payment_id)}</td>
            <td style="text-align: right;">{fmt_amount(record.amount)}</td>
            <td style="text-align: right;">{fmt_amount(record.final_settlement_amount)}</td>
            <td>{order_date}</td>
            <td>{fmt_text(&record.payment_date_time)}</td>
        </tr>
    }
}

#[component]
fn StatisticsCards(stats: ReadSignal<MergeStatistics>) -> impl IntoView {
    let card = "padding: 8px 12px; border: 1px solid var(--color-border-light); border-radius: 6px; min-width: 140px;";

    view! {
        <div style="display: flex; gap: 12px; flex-wrap: wrap;">
            <div style=card>
                <div style="font-size: var(--font-size-sm); color: var(--color-text-muted);">"Merged records"</div>
                <div style="font-size: 20px; font-weight: 600;">{move || stats.get().total_merged_records}</div>
            </div>
            <div style=card>
                <div style="font-size: var(--font-size-sm); color: var(--color-text-muted);">"Unique orders"</div>
                <div style="font-size: 20px; font-weight: 600;">{move || stats.get().unique_orders}</div>
            </div>
            <div style=card>
                <div style="font-size: var(--font-size-sm); color: var(--color-text-muted);">"With SKU"</div>
                <div style="font-size: 20px; font-weight: 600;">{move || fmt_percent(stats.get().sku_fraction())}</div>
            </div>
            <div style=card>
                <div style="font-size: var(--font-size-sm); color: var(--color-text-muted);">"With quantity"</div>
                <div style="font-size: 20px; font-weight: 600;">{move || fmt_percent(stats.get().quantity_fraction())}</div>
            </div>
            <div style=card>
                <div style="font-size: var(--font-size-sm); color: var(--color-text-muted);">"With product name"</div>
                <div style="font-size: 20px; font-weight: 600;">{move || fmt_percent(stats.get().product_name_fraction())}</div>
            </div>
            <div style=card>
                <div style="font-size: var(--font-size-sm); color: var(--color-text-muted);">"Status source"</div>
                {move || {
                    stats
                        .get()
                        .status_source_breakdown
                        .into_iter()
                        .map(|(source, count)| {
                            let label = StatusSource::from_code(&source).display_name().to_string();
                            view! { <div style="font-size: var(--font-size-sm);">{label} ": " {count}</div> }
                        })
                        .collect_view()
                }}
            </div>
        </div>

        {move || stats.get().warning.map(|warning| view! {
            <div style="margin-top: 8px; padding: 8px; background: #fff3cd; border: 1px solid #ffc107; border-radius: 4px;">
                {warning}
            </div>
        })}
    }
}

#[component]
fn OrdersByTimePanel(reload: ReadSignal<u32>) -> impl IntoView {
    let session = use_session();
    let (period_start, period_end) = default_chart_period();
    let (start, set_start) = signal(period_start);
    let (end, set_end) = signal(period_end);
    let (agg, set_agg) = signal(Aggregation::Month);
    let (points, set_points) = signal(Vec::<TimeSeriesPoint>::new());
    let (range_error, set_range_error) = signal(None::<String>);

    let sequencer = RequestSequencer::new();
    Effect::new(move |_| {
        reload.track();
        let (start_val, end_val, agg_val) = (start.get(), end.get(), agg.get());

        let (start_date, end_date) = match (parse_iso_date(&start_val), parse_iso_date(&end_val)) {
            (Ok(s), Ok(e)) if s <= e => (s, e),
            _ => {
                set_range_error.set(Some("Invalid period".to_string()));
                set_points.set(Vec::new());
                return;
            }
        };
        set_range_error.set(None);

        let ticket = sequencer.issue();
        let sequencer = sequencer.clone();
        let client = query_client(&session);
        spawn_local(async move {
            let chart = client.fetch_orders_by_time(start_date, end_date, agg_val).await;
            if sequencer.is_current(ticket) {
                set_points.set(chart.points);
            }
        });
    });

    let max_value = move || {
        points
            .get()
            .iter()
            .map(|p| p.value)
            .fold(0.0_f64, f64::max)
    };

    view! {
        <div style="margin-top: 16px;">
            <div style="display: flex; align-items: center; gap: 12px; margin-bottom: 8px;">
                <h3 style="margin: 0;">"Orders by time"</h3>
                <input type="date" prop:value=start on:input=move |ev| set_start.set(event_target_value(&ev)) />
                <input type="date" prop:value=end on:input=move |ev| set_end.set(event_target_value(&ev)) />
                <select
                    on:change=move |ev| {
                        if let Some(value) = Aggregation::from_code(&event_target_value(&ev)) {
                            set_agg.set(value);
                        }
                    }
                    prop:value=move || agg.get().code()
                >
                    {Aggregation::all()
                        .into_iter()
                        .map(|a| view! { <option value={a.code()}>{a.code()}</option> })
                        .collect_view()}
                </select>
                {move || range_error.get().map(|e| view! { <span style="color: #c62828;">{e}</span> })}
            </div>

            <table class="data-table" style="border-collapse: collapse;">
                <tbody>
                    {move || {
                        let max = max_value();
                        points
                            .get()
                            .into_iter()
                            .map(|p| {
                                let width = if max > 0.0 { p.value / max * 300.0 } else { 0.0 };
                                view! {
                                    <tr>
                                        <td style="padding: 2px 8px;">{p.period.clone()}</td>
                                        <td style="padding: 2px 8px; text-align: right;">{p.value}</td>
                                        <td style="padding: 2px 8px;">
                                            <div style={format!("height: 10px; width: {:.0}px; background: #42a5f5;", width)}></div>
                                        </td>
                                    </tr>
                                }
                            })
                            .collect_view()
                    }}
                </tbody>
            </table>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_formatting() {
        assert_eq!(fmt_amount(Some(1234.5)), "1234.50");
        assert_eq!(fmt_amount(None), "-");
        assert_eq!(fmt_text(&None), "-");
        assert_eq!(fmt_percent(0.256), "25.6%");
    }

    #[test]
    fn test_import_kind_label() {
        assert_eq!(ImportKind::Orders.label(), "orders");
        assert_eq!(ImportKind::Payments.label(), "payments");
    }
}
