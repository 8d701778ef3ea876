//! Stage prompt builders.
//!
//! Pure functions: `PipelineState` (plus whatever the stage has already
//! produced — findings text, a diagnosis) in, prompt text out. No I/O; the
//! driver is the only thing that reads or writes files.

use std::fmt::Write as _;

use noctua_types::{Pagination, PagePurpose, ReconReport, TestReport};

use crate::diagnosis::FailureCategory;
use crate::state::PipelineState;
use crate::workspace::Workspace;

/// Explore prompt: frames the URL + intent, gives numbered exploration
/// steps, asks for a detailed summary.
#[must_use]
pub fn explore_prompt(state: &PipelineState) -> String {
    format!(
        "You are reconnoitering a website to plan a scraper. This is exploration \
         only — do not write any files yet.\n\n\
         Target URL: {url}\n\
         Data to extract: {intent}\n\n\
         Work through the site methodically:\n\
         1. Probe the target URL and note the overall page structure and rendering mode \
            (static HTML vs. client-rendered).\n\
         2. Find the data portal: the search form, listing page, or API that surfaces \
            the records described above.\n\
         3. Map any search/filter form fields (name, selector, type, whether required, \
            and any option lists).\n\
         4. Intercept background API calls while interacting with the page; note their \
            URL, method, content type, and response shape.\n\
         5. Check for anti-bot defenses: CAPTCHA, Cloudflare challenge, rate limiting, \
            or a login wall.\n\
         6. Extract a few sample records so the shape of the data is concrete.\n\n\
         When you are done, write a detailed summary covering: site identity and type, \
         every page you visited and its purpose, form fields, data element selectors, \
         pagination mechanism, API endpoints found, anti-bot signals, sample records, \
         and which scraping strategy you'd recommend.",
        url = state.target_url,
        intent = state.user_intent,
    )
}

/// Synthesize prompt: pastes findings, restates URL + intent, demands a
/// JSON object matching the wire-form `ReconReport`.
#[must_use]
pub fn synthesize_prompt(state: &PipelineState, findings: &str) -> String {
    format!(
        "Target URL: {url}\n\
         Data to extract: {intent}\n\n\
         Here are the reconnaissance findings gathered in the previous step:\n\n\
         ---\n{findings}\n---\n\n\
         Convert these findings into a single JSON object matching the required schema \
         exactly. Every field must be present; use `null` for anything you don't have \
         information for rather than omitting the key. Do not include any text outside \
         the JSON object.",
        url = state.target_url,
        intent = state.user_intent,
    )
}

/// Schema prompt: passes recon-report path + output path, gives an example
/// schema with nullable fields.
#[must_use]
pub fn schema_prompt(state: &PipelineState, workspace: &Workspace) -> String {
    format!(
        "Read the reconnaissance report at {report} and write a validation schema for \
         the record shape it describes to {schema}.\n\n\
         Use a schema-validation style like the following as a model, adapting the \
         fields to what the recon report actually found (mark fields the site doesn't \
         always populate as nullable rather than omitting them):\n\n\
         ```ts\n\
         import {{ z }} from \"zod\";\n\n\
         export const RecordSchema = z.object({{\n\
         \u{20}\u{20}title: z.string(),\n\
         \u{20}\u{20}url: z.string().url(),\n\
         \u{20}\u{20}price: z.number().nullable(),\n\
         \u{20}\u{20}publishedAt: z.string().nullable(),\n\
         }});\n\n\
         export type ScrapedRecord = z.infer<typeof RecordSchema>;\n\
         ```\n\n\
         Write only {schema}; do not touch any other file.",
        report = workspace.recon_report_path().display(),
        schema = workspace.schema_path().display(),
    )
}

/// Codegen prompt: recon report, schema path, a deterministically-computed
/// relative scaffold import path, and worked examples of the
/// scraper-config shape.
#[must_use]
pub fn codegen_prompt(state: &PipelineState, workspace: &Workspace, base_dir: &std::path::Path) -> String {
    let scaffold_import = relative_scaffold_import(workspace, base_dir);
    let recon_summary = state
        .recon_report
        .as_ref()
        .map(summarize_recon_report)
        .unwrap_or_else(|| "(no recon report available)".to_string());

    format!(
        "Read the reconnaissance report at {report} and the schema at {schema}, then write \
         two files: {scraper} (the scraper implementation) and {index} (the CLI entry point).\n\n\
         Recon summary:\n{recon_summary}\n\n\
         Import the scraper scaffold from \"{scaffold_import}\" — it provides the runtime \
         the generated scraper links against (browser lifecycle, output writer, CLI arg \
         parsing for `--limit` and `--out`).\n\n\
         Worked example of the scraper-config shape {scraper} should export:\n\n\
         ```ts\n\
         import {{ defineScraper }} from \"{scaffold_import}\";\n\
         import {{ RecordSchema }} from \"./schema\";\n\n\
         export default defineScraper({{\n\
         \u{20}\u{20}name: \"{project}\",\n\
         \u{20}\u{20}startUrl: \"{url}\",\n\
         \u{20}\u{20}schema: RecordSchema,\n\
         \u{20}\u{20}async run(ctx) {{\n\
         \u{20}\u{20}\u{20}\u{20}// navigate, paginate, and yield records via ctx.emit(record)\n\
         \u{20}\u{20}}},\n\
         }});\n\
         ```\n\n\
         And the worked example of {index}:\n\n\
         ```ts\n\
         import scraper from \"./scraper\";\n\
         scraper.runCli();\n\
         ```\n\n\
         Write only {scraper} and {index}; do not touch schema.ts.",
        report = workspace.recon_report_path().display(),
        schema = workspace.schema_path().display(),
        scraper = workspace.scraper_path().display(),
        index = workspace.index_path().display(),
        project = state.project_name,
        url = state.target_url,
    )
}

/// Test prompt: the exact scraper run command and the output schema.
#[must_use]
pub fn test_prompt(workspace: &Workspace) -> String {
    format!(
        "Run the scraper with: `node {index} --limit 5 --out {report_dir}/sample-output.json`\n\n\
         Validate the output against the scraper's own schema (scraper_lint is available \
         for a static check before running). Report the outcome as a single JSON object \
         matching the required test-report schema exactly: success, exitCode, timedOut, \
         recordCount, durationMs, schemaErrors (empty array if none), up to three \
         sampleRecords, fieldCoverage (percentage per field across the sample), and the \
         captured stdout/stderr. Every field must be present; use `null` where the \
         schema allows it. Do not include any text outside the JSON object.",
        index = workspace.index_path().display(),
        report_dir = workspace.work_dir().display(),
    )
}

/// Repair prompt: full test history, a classified diagnosis block, and
/// search/listing page hints pulled from the recon report.
#[must_use]
pub fn repair_prompt(state: &PipelineState, category: FailureCategory) -> String {
    let mut history = String::new();
    for (i, report) in state.test_results.iter().enumerate() {
        let _ = writeln!(
            history,
            "  attempt {n}: {status}, {records} record(s), {errors} schema error(s)",
            n = i + 1,
            status = if report.success { "passed" } else { "failed" },
            records = report.record_count,
            errors = report.schema_errors.len(),
        );
        for error in &report.schema_errors {
            let _ = writeln!(history, "    - {}", error.message);
        }
    }

    let hints = state
        .recon_report
        .as_ref()
        .map(|report| format_page_hints(report))
        .unwrap_or_default();

    format!(
        "The scraper at {scraper_dir} is failing. Test history:\n{history}\n\
         Diagnosis: {diagnosis}\n\
         {hints}\n\
         Re-probe the live page if needed, then fix the scraper. Do not rewrite it from \
         scratch; make targeted edits.",
        scraper_dir = state.scraper_dir.display(),
        diagnosis = category.diagnosis_message(),
        hints = hints,
    )
}

/// Harden prompt: enumerates the hardening features to add, instructs
/// targeted edits.
#[must_use]
pub fn harden_prompt(workspace: &Workspace) -> String {
    format!(
        "The scraper at {scraper_dir} passed its test run. Harden it for production use \
         via targeted edits (do not rewrite it from scratch):\n\
         - Retry transient navigation/network failures with backoff.\n\
         - Rate-limit requests to avoid tripping the site's own throttling.\n\
         - Handle errors per-record so one bad record doesn't abort the whole run.\n\
         - Log progress (records seen, records emitted, current page) as it runs.\n\
         - Validate CLI arguments (`--limit`, `--out`) and fail fast with a clear message \
           on invalid input.",
        scraper_dir = workspace.scraper_dir().display(),
    )
}

/// Count directory levels from `base_dir` down to the scraper directory and
/// build the matching `../../..` relative import down to `scaffold`.
fn relative_scaffold_import(workspace: &Workspace, base_dir: &std::path::Path) -> String {
    let depth = workspace
        .scraper_dir()
        .strip_prefix(base_dir)
        .map(|suffix| suffix.components().count())
        .unwrap_or(4);
    let mut import = "../".repeat(depth.max(1));
    import.push_str("scaffold");
    import
}

fn summarize_recon_report(report: &ReconReport) -> String {
    let mut summary = format!(
        "- site: {name} ({url}), type {site_type:?}, strategy {strategy:?}\n",
        name = report.site_name,
        url = report.url,
        site_type = report.site_type,
        strategy = report.suggested_strategy,
    );
    for page in &report.pages {
        let _ = writeln!(summary, "  - page {} ({:?})", page.url, page.purpose);
    }
    if let Some(endpoints) = &report.api_endpoints {
        for endpoint in endpoints {
            let _ = writeln!(summary, "  - api {} {}", endpoint.method, endpoint.url);
        }
    }
    summary
}

fn format_page_hints(report: &ReconReport) -> String {
    let hints: Vec<&str> = report
        .pages
        .iter()
        .filter(|p| matches!(p.purpose, PagePurpose::Search | PagePurpose::Listing))
        .map(|p| p.url.as_str())
        .collect();
    if hints.is_empty() {
        return String::new();
    }
    format!("Search/listing pages from recon: {}\n", hints.join(", "))
}

/// Reinforced file-presence retry hints, one per stage whose output is
/// file-presence-checked.
#[must_use]
pub fn schema_retry_hint() -> &'static str {
    "Write the schema file to the exact path given above before finishing."
}

#[must_use]
pub fn codegen_retry_hint() -> &'static str {
    "Both files must exist at the exact paths given above before finishing."
}
