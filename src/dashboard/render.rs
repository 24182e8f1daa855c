//! HTML rendering of a dashboard snapshot

use serde_json::{json, Value};

use crate::api::types::TradeRecord;
use crate::chart::{ChartView, GridChart};
use crate::form::{FormView, Notice};
use crate::format::{escape_html, format_optional};

use super::runner::{DashboardSnapshot, GridPanel};

/// Chart.js configuration of a grid chart, tooltips precomputed per point
pub fn chart_config(chart: &GridChart) -> Value {
    let datasets: Vec<Value> = chart
        .datasets()
        .iter()
        .map(|ds| {
            let data: Vec<Value> = ds
                .points
                .iter()
                .map(|p| json!({ "x": p.x, "y": p.y, "filled": p.filled, "tip": ds.tooltip(p) }))
                .collect();
            json!({
                "label": ds.label,
                "data": data,
                "borderColor": ds.style.border_color,
                "backgroundColor": ds.style.background_color,
                "borderWidth": ds.style.border_width,
                "pointRadius": ds.style.point_radius,
                "pointHoverRadius": ds.style.point_hover_radius,
                "showLine": ds.style.show_line,
                "hidden": ds.hidden,
                "fill": false,
                "tension": 0,
            })
        })
        .collect();

    json!({
        "type": "line",
        "data": { "labels": chart.labels, "datasets": datasets },
        "options": {
            "responsive": true,
            "maintainAspectRatio": false,
            "parsing": { "xAxisKey": "x", "yAxisKey": "y" },
            "scales": {
                "x": { "display": false, "beginAtZero": true, "type": "linear" },
                "y": { "min": chart.y_min, "max": chart.y_max, "grid": { "color": "rgba(255, 255, 255, 0.1)" } }
            },
            "plugins": { "legend": { "display": true, "position": "bottom" } }
        }
    })
}

fn notice_html(notice: &Notice, class: &str) -> String {
    match notice {
        Notice::Hidden => String::new(),
        Notice::Text(text) => format!(r#"<div class="{}">{}</div>"#, class, escape_html(text)),
        // markup is built from escaped parts
        Notice::Markup(markup) => markup.clone(),
    }
}

fn render_form(form: &FormView) -> String {
    let market = if form.market_price.visible {
        format!(r#"<div id="marketInfo">Market price: <span id="currentPrice">{}</span></div>"#, escape_html(&form.market_price.text))
    } else {
        String::new()
    };
    let wallet = if form.wallet.visible {
        format!(r#"<div id="walletInfo">Wallet: <span id="walletBalance">{}</span> USDT</div>"#, escape_html(&form.wallet.text))
    } else {
        String::new()
    };
    let preview = form
        .grid_step_preview
        .as_ref()
        .map(|p| format!(r#"<div id="gridPreview">{}</div>"#, escape_html(&p.text)))
        .unwrap_or_default();
    let symbols: String = form
        .symbols
        .iter()
        .map(|s| format!(r#"<option value="{0}">{0}</option>"#, escape_html(s)))
        .collect();

    format!(
        r#"<section class="panel" id="createGridForm">
    <h2>New Grid</h2>
    {symbols_notice}
    <select id="symbol"><option value="">Select symbol</option>{symbols}</select>
    {market}{market_error}
    {wallet}{wallet_error}
    <dl>
        <dt>Range</dt><dd id="rangePercentageValue">{range}</dd>
        <dt>Lower bound</dt><dd id="lowerBound">{lower}</dd>
        <dt>Upper bound</dt><dd id="upperBound">{upper}</dd>
        <dt>Allocation</dt><dd id="allocationAmount">{allocation}</dd>
        <dt>Quantity per grid</dt><dd id="quantityPerGrid">{quantity}</dd>
    </dl>
    {preview}
    {submit_notice}
</section>"#,
        symbols_notice = notice_html(&form.symbols_notice, "alert alert-warning"),
        symbols = symbols,
        market = market,
        market_error = notice_html(&form.market_error, "alert alert-danger"),
        wallet = wallet,
        wallet_error = notice_html(&form.wallet_error, "alert alert-danger"),
        range = escape_html(&form.range_percent_display),
        lower = escape_html(&form.lower_bound),
        upper = escape_html(&form.upper_bound),
        allocation = escape_html(&form.allocation_amount),
        quantity = escape_html(&form.quantity_per_grid),
        preview = preview,
        submit_notice = notice_html(&form.submit_notice, "alert alert-info"),
    )
}

fn render_trades(trades: &[TradeRecord]) -> String {
    if trades.is_empty() {
        return r#"<p class="muted">No trades yet</p>"#.to_string();
    }
    let rows: String = trades
        .iter()
        .map(|t| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&t.executed_at),
                escape_html(t.side.as_deref().unwrap_or("-")),
                escape_html(t.position_side.as_deref().unwrap_or("-")),
                format_optional(t.price, 6),
                format_optional(t.quantity, 6),
                format_optional(t.realized_profit, 4),
            )
        })
        .collect();
    format!(
        "<table class=\"trades\"><tr><th>Time</th><th>Side</th><th>Position</th><th>Price</th><th>Qty</th><th>PnL</th></tr>{}</table>",
        rows
    )
}

fn render_card(panel: &GridPanel) -> String {
    let id = panel.card.id;
    let status = match (panel.card.active, panel.card.requested) {
        (_, Some(true)) => "Start requested",
        (_, Some(false)) => "Stop requested",
        (true, None) => "Running",
        (false, None) => "Stopped",
    };
    let button = if panel.card.expected_active() { "Stop" } else { "Start" };

    let (info, summary) = match &panel.chart {
        Some(ChartView { info, display, .. }) => {
            let info_html = if panel.card.info_panel {
                format!(
                    r#"<div class="grid-info"><span class="{}">{}</span> <span class="current-price">{}</span></div>"#,
                    escape_html(&info.bot_type_class),
                    escape_html(&info.bot_type_label),
                    info.current_price.as_deref().map(escape_html).unwrap_or_default()
                )
            } else {
                String::new()
            };
            let summary_html = display
                .as_ref()
                .map(|d| {
                    format!(
                        r#"<span class="lower-bound">{}</span> <span class="upper-bound">{}</span> <span class="grid-step">{}</span> <span class="range-percent">{}</span>"#,
                        escape_html(&d.lower_bound),
                        escape_html(&d.upper_bound),
                        escape_html(&d.grid_step),
                        d.range_percent.as_deref().map(escape_html).unwrap_or_default()
                    )
                })
                .unwrap_or_default();
            (info_html, summary_html)
        }
        None => (String::new(), String::new()),
    };

    let stats = if panel.card.stats_container {
        let s = panel.stats.clone().unwrap_or_default();
        format!(
            r#"<div id="gridStats{id}">{summary}
        <div>Profit <span id="totalProfit{id}">{profit}</span></div>
        <div>Win rate <span id="winRate{id}">{win_rate}</span></div>
        <div>Trades <span id="totalTrades{id}">{trades}</span></div>
    </div>"#,
            id = id,
            summary = summary,
            profit = escape_html(&s.total_profit),
            win_rate = escape_html(&s.win_rate),
            trades = escape_html(&s.total_trades),
        )
    } else {
        String::new()
    };

    let chart = if panel.card.chart_mount {
        let config = panel
            .chart
            .as_ref()
            .map(|v| chart_config(&v.chart))
            .unwrap_or(Value::Null);
        // keep "</script>" out of the inline JSON
        let config = config.to_string().replace("</", "<\\/");
        format!(
            r#"<div class="chart-box"><canvas id="gridChart{id}"></canvas></div>
    <script>drawGridChart({id}, {config});</script>"#,
            id = id,
            config = config
        )
    } else {
        String::new()
    };

    let trades = if panel.card.trades_table {
        render_trades(&panel.trades)
    } else {
        String::new()
    };

    format!(
        r#"<section class="panel grid-card" data-grid-id="{id}" data-active="{active}">
    <h2>Grid #{id} <span class="status">{status}</span></h2>
    {info}
    {chart}
    {stats}
    {trades}
    <form id="toggleForm{id}" method="post" action="/api/grid/{id}/toggle">
        <button type="submit">{button}</button>
    </form>
</section>"#,
        id = id,
        active = panel.card.active,
        status = status,
        info = info,
        chart = chart,
        stats = stats,
        trades = trades,
        button = button,
    )
}

/// Full dashboard page
pub fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let cards: String = snapshot.grids.iter().map(render_card).collect::<Vec<_>>().join("\n");
    let refresh_ms = snapshot.refresh_interval_secs * 1000;

    format!(
        r##"<!DOCTYPE html>
<html>
<head>
    <title>Grid Dashboard</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
    <style>
        :root {{
            --bg-dark: #0d0d12;
            --bg-panel: #16161f;
            --border: #2a2a3a;
            --text-primary: #e6e6e6;
            --text-secondary: #9494a8;
            --buy: #00c2a2;
            --sell: #ff3b69;
        }}
        body {{
            background: var(--bg-dark);
            color: var(--text-primary);
            font-family: 'Inter', sans-serif;
            margin: 0;
            padding: 16px;
            display: grid;
            grid-template-columns: 360px 1fr;
            gap: 16px;
        }}
        .panel {{ background: var(--bg-panel); border: 1px solid var(--border); border-radius: 6px; padding: 12px; }}
        .grid-card {{ margin-bottom: 16px; }}
        .chart-box {{ height: 260px; }}
        .text-success {{ color: var(--buy); }}
        .text-danger {{ color: var(--sell); }}
        .text-primary {{ color: #00c2ff; }}
        .muted {{ color: var(--text-secondary); }}
        .alert {{ padding: 8px; border-radius: 4px; margin: 8px 0; }}
        .alert-warning {{ background: rgba(241, 196, 15, 0.15); }}
        .alert-danger {{ background: rgba(255, 59, 105, 0.15); }}
        table.trades {{ width: 100%; font-family: 'JetBrains Mono', monospace; font-size: 12px; }}
    </style>
    <script>
        function drawGridChart(gridId, config) {{
            if (!config) return;
            const ctx = document.getElementById('gridChart' + gridId);
            if (!ctx) return;
            config.options.plugins.tooltip = {{
                callbacks: {{ label: (context) => context.raw.tip }}
            }};
            new Chart(ctx, config);
        }}
        setTimeout(() => window.location.reload(), {refresh_ms});
    </script>
</head>
<body>
    {form}
    <main>
{cards}
    </main>
</body>
</html>"##,
        refresh_ms = refresh_ms,
        form = render_form(&snapshot.form),
        cards = cards,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{BotType, GridSnapshot, PositionEntry};
    use crate::chart::GridInfo;
    use crate::dashboard::page::GridCard;
    use crate::dashboard::stats::GridStatsView;
    use crate::form::FormState;

    fn panel(active: bool) -> GridPanel {
        let snapshot = GridSnapshot {
            grid_levels: vec![100.0, 105.0],
            long_positions: vec![PositionEntry::new(100.0, true)],
            current_price: Some(101.0),
            bot_type: Some(BotType::Long),
            ..Default::default()
        };
        let mut chart = GridChart::new();
        chart.apply_snapshot(&snapshot);
        let mut info = GridInfo::default();
        info.apply_snapshot(&snapshot);

        GridPanel {
            card: GridCard::new(4, active),
            chart: Some(ChartView { chart, info, display: None }),
            stats: Some(GridStatsView {
                total_profit: "1.2500".into(),
                win_rate: "60.00%".into(),
                total_trades: "5".into(),
            }),
            trades: vec![],
        }
    }

    fn snapshot(grids: Vec<GridPanel>) -> DashboardSnapshot {
        DashboardSnapshot {
            form: FormView::default(),
            form_state: FormState::default(),
            grids,
            refresh_interval_secs: 30,
        }
    }

    #[test]
    fn test_chart_config_carries_tooltips() {
        let config = chart_config(&panel(true).chart.unwrap().chart);
        let datasets = config["data"]["datasets"].as_array().unwrap();

        assert_eq!(datasets.len(), 4);
        assert_eq!(datasets[1]["label"], "Long Positions");
        assert_eq!(datasets[1]["data"][0]["tip"], "Long Positions: Price: 100 (Long) - Filled");
        assert_eq!(datasets[2]["hidden"], true);
        assert_eq!(config["options"]["scales"]["y"]["min"], 99.75);
    }

    #[test]
    fn test_card_has_toggle_form_and_stats() {
        let html = render_dashboard(&snapshot(vec![panel(true)]));

        assert!(html.contains(r#"<form id="toggleForm4" method="post" action="/api/grid/4/toggle">"#));
        assert!(html.contains(r#"<span id="winRate4">60.00%</span>"#));
        assert!(html.contains("Long Only"));
        assert!(html.contains("drawGridChart(4, {"));
        assert!(html.contains("30000"));
    }

    #[test]
    fn test_stopped_card_offers_start() {
        let html = render_dashboard(&snapshot(vec![panel(false)]));
        assert!(html.contains(r#"data-active="false""#));
        assert!(html.contains(">Start</button>"));
    }

    #[test]
    fn test_pending_start_shows_request() {
        let mut pending = panel(false);
        pending.card.requested = Some(true);
        let html = render_dashboard(&snapshot(vec![pending]));

        assert!(html.contains(r#"<span class="status">Start requested</span>"#));
        assert!(html.contains(r#"data-active="false""#));
        assert!(html.contains(">Stop</button>"));
    }

    #[test]
    fn test_form_errors_are_escaped() {
        let mut form = FormView::default();
        form.wallet_error = Notice::Text("<b>bad</b>".into());
        let html = render_form(&form);
        assert!(html.contains("&lt;b&gt;bad&lt;/b&gt;"));
    }
}
