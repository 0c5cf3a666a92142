use anyhow::Result;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;
use tracing::warn;

use super::context::{DashboardContext, price_distribution};
use crate::error::PredictError;
use crate::models::{CleanedListing, FeatureRow, ReviewsBucket};

pub const PAGE_TITLE: &str = "E-commerce Price Insights & Prediction";
pub const MODEL_UNAVAILABLE: &str = "Model not available — predictions disabled.";

const CHART_SIZE: (u32, u32) = (720, 260);

/// Prediction inputs as submitted by the form; absent fields take the
/// form's initial values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictForm {
    pub rating: f64,
    pub reviews_count: i64,
    pub name_len: i64,
    pub has_pro: Option<String>,
    pub has_ultra: Option<String>,
    pub reviews_bucket: String,
}

impl Default for PredictForm {
    fn default() -> Self {
        Self {
            rating: 4.0,
            reviews_count: 100,
            name_len: 30,
            has_pro: None,
            has_ultra: None,
            reviews_bucket: ReviewsBucket::VeryLow.to_string(),
        }
    }
}

impl PredictForm {
    fn checked(value: &Option<String>) -> bool {
        value
            .as_deref()
            .is_some_and(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
    }

    /// The fixed-schema row for this input, named "custom" on page 1
    pub fn to_feature_row(&self) -> Result<FeatureRow, PredictError> {
        let bucket: ReviewsBucket = self.reviews_bucket.parse()?;
        Ok(FeatureRow::new(
            "custom",
            self.rating,
            self.reviews_count,
            self.name_len,
            Self::checked(&self.has_pro),
            Self::checked(&self.has_ultra),
            bucket,
            1,
        )?)
    }
}

/// `54990` → `"54,990"`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Whole-rupee display of an estimate, truncated toward zero
pub fn format_price(currency: &str, estimate: f64) -> String {
    format!("{}{}", currency, format_thousands(estimate.trunc() as i64))
}

/// Bar chart of `(price, count)` pairs, one bar per distinct price, as an
/// SVG document ready to inline
pub fn price_chart_svg(counts: &[(i64, usize)]) -> Result<String> {
    use plotters::prelude::*;

    const BAR_COLOR: RGBColor = RGBColor(76, 120, 168);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let max_count = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
        if max_count > 0 {
            let mut chart = ChartBuilder::on(&root)
                .margin(10)
                .build_cartesian_2d(0f64..counts.len() as f64, 0f64..max_count as f64)?;
            chart.draw_series(counts.iter().enumerate().map(|(i, (_, count))| {
                let left = i as f64;
                Rectangle::new([(left + 0.1, 0.0), (left + 0.9, *count as f64)], BAR_COLOR.filled())
            }))?;
        }
        root.present()?;
    }
    Ok(svg)
}

/// Price span under the chart, `None` for an empty distribution
fn price_range_caption(counts: &[(i64, usize)]) -> Option<String> {
    let (low, _) = counts.first()?;
    let (high, _) = counts.last()?;
    Some(format!(
        r#"<p class="caption">{} distinct prices from ₹{} to ₹{}</p>"#,
        counts.len(),
        format_thousands(*low),
        format_thousands(*high)
    ))
}

fn preview_table(listings: &[CleanedListing], rows: usize) -> String {
    let mut html = String::from(
        "<table><thead><tr><th>product_name</th><th>price</th><th>rating</th><th>reviews_count</th>\
         <th>source</th><th>query</th><th>page</th><th>name_len</th><th>has_pro</th>\
         <th>has_ultra</th><th>reviews_bucket</th></tr></thead><tbody>",
    );
    for l in listings.iter().take(rows) {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            encode_text(&l.product_name),
            l.price,
            l.rating,
            l.reviews_count,
            encode_text(&l.source),
            encode_text(&l.query),
            l.page,
            l.name_len,
            l.has_pro,
            l.has_ultra,
            l.reviews_bucket
        ));
    }
    html.push_str("</tbody></table>");
    html
}

fn prediction_form(form: &PredictForm) -> String {
    let options: String = ReviewsBucket::ALL
        .iter()
        .map(|bucket| {
            let selected = if bucket.as_str() == form.reviews_bucket { " selected" } else { "" };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                encode_double_quoted_attribute(bucket.as_str()),
                selected,
                encode_text(bucket.as_str())
            )
        })
        .collect();
    let checked = |value: &Option<String>| if PredictForm::checked(value) { " checked" } else { "" };

    format!(
        r#"<form method="get" action="/predict">
<label>Rating <input type="range" name="rating" min="0" max="5" step="0.1" value="{rating}" oninput="this.nextElementSibling.textContent=this.value"><output>{rating}</output></label>
<label>Reviews count <input type="number" name="reviews_count" min="0" max="5000" value="{reviews}"></label>
<label>Name length <input type="number" name="name_len" min="1" max="200" value="{name_len}"></label>
<label><input type="checkbox" name="has_pro" value="1"{pro}> Contains 'Pro'</label>
<label><input type="checkbox" name="has_ultra" value="1"{ultra}> Contains 'Ultra'</label>
<label>Reviews bucket <select name="reviews_bucket">{options}</select></label>
<button type="submit">Predict</button>
</form>"#,
        rating = encode_double_quoted_attribute(&form.rating.to_string()),
        reviews = encode_double_quoted_attribute(&form.reviews_count.to_string()),
        name_len = encode_double_quoted_attribute(&form.name_len.to_string()),
        pro = checked(&form.has_pro),
        ultra = checked(&form.has_ultra),
        options = options
    )
}

fn prediction_section(ctx: &DashboardContext, form: &PredictForm, input_error: Option<&str>) -> String {
    let mut html = String::from("<h2>Model prediction</h2>");

    if ctx.model.is_err() {
        html.push_str(&format!(r#"<p class="warning">{}</p>"#, encode_text(MODEL_UNAVAILABLE)));
        return html;
    }

    html.push_str(&prediction_form(form));
    let outcome = match input_error {
        Some(message) => Err(message.to_string()),
        None => form
            .to_feature_row()
            .and_then(|row| ctx.predict(&row).unwrap_or_else(|| Err(PredictError::Estimator("no model".to_string()))))
            .map_err(|e| e.to_string()),
    };
    match outcome {
        Ok(estimate) => html.push_str(&format!(
            r#"<p class="prediction"><strong>Predicted price:</strong> {}</p>"#,
            format_price("₹", estimate)
        )),
        Err(message) => html.push_str(&format!(
            r#"<p class="error">Prediction failed: {}</p>"#,
            encode_text(&message)
        )),
    }
    html
}

/// The full dashboard page for one set of form inputs. `input_error` carries
/// a submission that could not be read as a form; it is reported in place of
/// a prediction.
pub fn render_page(
    ctx: &DashboardContext,
    form: &PredictForm,
    input_error: Option<&str>,
    preview_rows: usize,
) -> String {
    let mut body = format!("<h1>{}</h1>", encode_text(PAGE_TITLE));

    for diagnostic in ctx.diagnostics() {
        body.push_str(&format!(r#"<p class="error">{}</p>"#, encode_text(&diagnostic)));
    }

    if let Ok(listings) = &ctx.data {
        body.push_str("<h2>Dataset preview</h2>");
        body.push_str(&preview_table(listings, preview_rows));

        body.push_str("<h2>Price distribution</h2>");
        let counts = price_distribution(listings);
        match price_chart_svg(&counts) {
            Ok(svg) => body.push_str(&svg),
            Err(e) => {
                warn!("Price chart failed: {:#}", e);
                body.push_str(&format!(r#"<p class="error">Chart unavailable: {}</p>"#, encode_text(&e.to_string())));
            }
        }
        if let Some(caption) = price_range_caption(&counts) {
            body.push_str(&caption);
        }

        body.push_str(&prediction_section(ctx, form, input_error));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem auto; max-width: 960px; }}
table {{ border-collapse: collapse; font-size: 0.9rem; }}
th, td {{ border: 1px solid #ddd; padding: 4px 8px; text-align: left; }}
form label {{ display: block; margin: 0.5rem 0; }}
.error {{ color: #b00020; }}
.warning {{ color: #8a6d00; }}
.caption {{ color: #555; font-size: 0.85rem; }}
</style>
</head>
<body>
{body}
</body>
</html>"#,
        title = encode_text(PAGE_TITLE),
        body = body
    )
}
