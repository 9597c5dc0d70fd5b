//!
//! juronet CLI binary
//! ------------------
//! Command-line tool and interactive interpreter for operating a juronet
//! server over its HTTP API. Signs in as staff (provider access token) or as
//! a customer (invoice number + phone), then runs portal commands one-shot
//! or in a REPL.

use std::env;
use std::io::{self, Write};

use anyhow::{anyhow, Result};
use serde_json::json;

use juronet::cli::connectivity::HttpSession;
use juronet::cli::{print_rows, print_summary};
use juronet::device::{
    copy_text, current_location, default_clipboard, open_in_maps, EnvGeolocator, NoClipboard,
    ShellLinkOpener,
};
use juronet::format::maps_url;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --connect <url> --token <access-token> [command...]\n  {program} --connect <url> --invoice <JRN-XXXXXX> --phone <number> [command...]\n  {program} --repl [--connect <url> --token <t> | --invoice <n> --phone <p>]\n\nFlags:\n  --connect <url>        Server base URL (default http://127.0.0.1:7878)\n  --token <t>            Staff sign-in with a provider access token\n  --invoice <n>          Customer sign-in: invoice number (use with --phone)\n  --phone <p>            Customer sign-in: phone number (use with --invoice)\n  --repl                 Start interactive mode\n  -h, --help             Show this help\n\nStaff commands:\n  dashboard                          headline numbers\n  customers                          customer list\n  customer <id>                      one customer with history\n  payments [pending|verified|rejected]\n  verify <payment-id> [notes...]\n  reject <payment-id> [notes...]\n  tickets [open|in_progress|resolved|closed]\n  reply <ticket-id> <message...>\n  financial [YYYY-MM]\n  maps                               customers with coordinates\n  locate <customer-id>               open a customer's position in the maps browser\n  copy-invoice <customer-id>         copy an invoice number to the clipboard\n\nCustomer commands:\n  portal                             account overview\n  my-payments                        payment history\n  pay <amount> <YYYY-MM> <method> [notes...]\n  my-tickets                         ticket history\n  open-ticket <category> <subject> <message...>\n\nCommon commands:\n  whereami                           print this host's position fix\n  logout                             end the session\n\nInteractive commands:\n  connect <url> token <t>            staff sign-in\n  connect <url> customer <inv> <ph>  customer sign-in\n  disconnect                         end the session\n  status                             show connection info\n  help                               show this help\n  quit | exit                        exit the interpreter\n\nExamples:\n  {program} --connect http://127.0.0.1:7878 --token tok-... dashboard\n  {program} --connect http://127.0.0.1:7878 --token tok-... payments pending\n  {program} --connect http://127.0.0.1:7878 --invoice JRN-240101 --phone 081234567001 portal\n  {program} --repl --connect http://127.0.0.1:7878 --token tok-..."
    );
}

const CUSTOMER_COLS: &[&str] =
    &["invoice_number", "name", "phone", "derived_status", "monthly_fee_display", "due_date", "address"];
const PAYMENT_COLS: &[&str] = &[
    "id",
    "customer_name",
    "invoice_number",
    "amount_display",
    "payment_month",
    "payment_method",
    "status",
];
const SELF_PAYMENT_COLS: &[&str] =
    &["payment_date", "payment_month", "amount_display", "payment_method", "status"];
const TICKET_COLS: &[&str] = &["id", "customer_name", "subject", "priority", "status", "created_at"];
const SELF_TICKET_COLS: &[&str] = &["subject", "category", "priority", "status", "admin_reply"];
const MAP_COLS: &[&str] =
    &["invoice_number", "name", "latitude", "longitude", "derived_status", "maps_url"];

fn dump(v: &serde_json::Value) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s),
        Err(_) => println!("{}", v),
    }
}

/// Dispatch one command against a signed-in session.
fn run_command(rt: &tokio::runtime::Runtime, session: &HttpSession, parts: &[String]) -> Result<()> {
    let cmd = parts[0].as_str();
    match cmd {
        "dashboard" => {
            let v = rt.block_on(session.get("/admin/dashboard"))?;
            if !print_summary(&v, "dashboard") {
                dump(&v);
            }
        }
        "customers" => {
            let v = rt.block_on(session.get("/admin/customers"))?;
            if !print_rows(&v, "customers", CUSTOMER_COLS) {
                dump(&v);
            }
        }
        "customer" => {
            let id = parts.get(1).ok_or_else(|| anyhow!("usage: customer <id>"))?;
            let v = rt.block_on(session.get(&format!("/admin/customers/{}", id)))?;
            if !print_summary(&v, "customer") {
                dump(&v);
                return Ok(());
            }
            println!("payments:");
            print_rows(&v, "payments", SELF_PAYMENT_COLS);
            println!("tickets:");
            print_rows(&v, "tickets", SELF_TICKET_COLS);
        }
        "payments" => {
            let status = parts.get(1).map(String::as_str).unwrap_or("pending");
            let v = rt.block_on(session.get(&format!("/admin/payments?status={}", status)))?;
            if !print_rows(&v, "payments", PAYMENT_COLS) {
                dump(&v);
            }
        }
        "verify" | "reject" => {
            let id = parts.get(1).ok_or_else(|| anyhow!("usage: {} <payment-id> [notes...]", cmd))?;
            let notes =
                if parts.len() > 2 { Some(parts[2..].join(" ")) } else { None };
            let v = rt.block_on(
                session.post(&format!("/admin/payments/{}/{}", id, cmd), &json!({"notes": notes})),
            )?;
            if !print_summary(&v, "payment") {
                dump(&v);
            }
        }
        "tickets" => {
            let path = match parts.get(1) {
                Some(status) => format!("/admin/tickets?status={}", status),
                None => "/admin/tickets".to_string(),
            };
            let v = rt.block_on(session.get(&path))?;
            if !print_rows(&v, "tickets", TICKET_COLS) {
                dump(&v);
            }
        }
        "reply" => {
            let id = parts.get(1).ok_or_else(|| anyhow!("usage: reply <ticket-id> <message...>"))?;
            if parts.len() < 3 {
                return Err(anyhow!("usage: reply <ticket-id> <message...>"));
            }
            let message = parts[2..].join(" ");
            let v = rt.block_on(
                session.post(&format!("/admin/tickets/{}/reply", id), &json!({"reply": message})),
            )?;
            if !print_summary(&v, "ticket") {
                dump(&v);
            }
        }
        "financial" => {
            let path = match parts.get(1) {
                Some(month) => format!("/admin/financial?month={}", month),
                None => "/admin/financial".to_string(),
            };
            let v = rt.block_on(session.get(&path))?;
            let summary = &v["summary"];
            if !print_summary(summary, "totals") {
                dump(&v);
                return Ok(());
            }
            println!("income:");
            print_rows(summary, "income", &["date", "category", "description", "amount_display", "source", "payment_method"]);
            println!("expenses:");
            print_rows(summary, "expenses", &["date", "category", "description", "amount_display", "vendor", "payment_method"]);
        }
        "maps" => {
            let v = rt.block_on(session.get("/admin/maps"))?;
            if !print_rows(&v, "points", MAP_COLS) {
                dump(&v);
            }
        }
        "locate" => {
            let id = parts.get(1).ok_or_else(|| anyhow!("usage: locate <customer-id>"))?;
            let v = rt.block_on(session.get(&format!("/admin/customers/{}", id)))?;
            let customer = &v["customer"];
            let (lat, lng) = match (customer["latitude"].as_f64(), customer["longitude"].as_f64()) {
                (Some(lat), Some(lng)) => (lat, lng),
                _ => return Err(anyhow!("customer has no recorded coordinates")),
            };
            let opener = ShellLinkOpener::new();
            rt.block_on(open_in_maps(&opener, lat, lng))?;
            println!("opened {}", maps_url(lat, lng));
        }
        "copy-invoice" => {
            let id = parts.get(1).ok_or_else(|| anyhow!("usage: copy-invoice <customer-id>"))?;
            let v = rt.block_on(session.get(&format!("/admin/customers/{}", id)))?;
            let Some(invoice) = v["customer"]["invoice_number"].as_str() else {
                return Err(anyhow!("response carries no invoice number"));
            };
            let clipboard = default_clipboard();
            match rt.block_on(copy_text(clipboard.as_ref(), &NoClipboard, invoice)) {
                Ok(()) => println!("copied {}", invoice),
                Err(e) => {
                    eprintln!("clipboard unavailable: {}", e);
                    println!("invoice: {}", invoice);
                }
            }
        }
        "portal" => {
            let v = rt.block_on(session.get("/customer/portal"))?;
            let portal = &v["portal"];
            if !print_summary(portal, "account") {
                dump(&v);
                return Ok(());
            }
            println!("recent payments:");
            print_rows(portal, "recent_payments", SELF_PAYMENT_COLS);
            println!("open tickets:");
            print_rows(portal, "open_tickets", SELF_TICKET_COLS);
        }
        "my-payments" => {
            let v = rt.block_on(session.get("/customer/payments"))?;
            if !print_rows(&v, "payments", SELF_PAYMENT_COLS) {
                dump(&v);
            }
        }
        "pay" => {
            if parts.len() < 4 {
                return Err(anyhow!("usage: pay <amount> <YYYY-MM> <method> [notes...]"));
            }
            let amount: i64 =
                parts[1].parse().map_err(|_| anyhow!("amount must be a whole number of rupiah"))?;
            let month = &parts[2];
            let method = &parts[3];
            let notes =
                if parts.len() > 4 { Some(parts[4..].join(" ")) } else { None };
            let v = rt.block_on(session.post(
                "/customer/payments",
                &json!({"amount": amount, "payment_month": month, "payment_method": method, "notes": notes}),
            ))?;
            if !print_summary(&v, "payment") {
                dump(&v);
            }
        }
        "my-tickets" => {
            let v = rt.block_on(session.get("/customer/tickets"))?;
            if !print_rows(&v, "tickets", SELF_TICKET_COLS) {
                dump(&v);
            }
        }
        "open-ticket" => {
            if parts.len() < 4 {
                return Err(anyhow!("usage: open-ticket <category> <subject> <message...>"));
            }
            let category = &parts[1];
            let subject = &parts[2];
            let message = parts[3..].join(" ");
            let v = rt.block_on(session.post(
                "/customer/tickets",
                &json!({"category": category, "subject": subject, "message": message}),
            ))?;
            if !print_summary(&v, "ticket") {
                dump(&v);
            }
        }
        "whereami" => {
            let fix = rt.block_on(current_location(&EnvGeolocator::new()))?;
            match fix.accuracy {
                Some(accuracy) => println!(
                    "lat={} lng={} accuracy={}m\n{}",
                    fix.latitude,
                    fix.longitude,
                    accuracy,
                    maps_url(fix.latitude, fix.longitude)
                ),
                None => println!(
                    "lat={} lng={}\n{}",
                    fix.latitude,
                    fix.longitude,
                    maps_url(fix.latitude, fix.longitude)
                ),
            }
        }
        "logout" => {
            rt.block_on(session.logout())?;
            println!("signed out");
        }
        other => return Err(anyhow!("unknown command '{}' (try help)", other)),
    }
    Ok(())
}

fn establish(
    rt: &tokio::runtime::Runtime,
    url: &str,
    token: Option<&str>,
    invoice: Option<&str>,
    phone: Option<&str>,
) -> Result<HttpSession> {
    if let Some(token) = token {
        return rt.block_on(HttpSession::connect_staff(url, token));
    }
    if let (Some(invoice), Some(phone)) = (invoice, phone) {
        return rt.block_on(HttpSession::connect_customer(url, invoice, phone));
    }
    Err(anyhow!("no credentials: pass --token, or --invoice with --phone"))
}

fn main() -> Result<()> {
    println!(
        r"    _                            __
   (_)_  ___________  ____  ___  / /_
  / / / / / ___/ __ \/ __ \/ _ \/ __/
 / / /_/ / /  / /_/ / / / /  __/ /_
/ /\__,_/_/   \____/_/ /_/\___/\__/
|_/        Command Line Interface"
    );
    // Initialize tracing subscriber so connection errors are visible on the command line
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut connect_url: String = "http://127.0.0.1:7878".to_string();
    let mut token: Option<String> = None;
    let mut invoice: Option<String> = None;
    let mut phone: Option<String> = None;
    let mut repl: bool = false;
    let mut command: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--connect" => {
                if i + 1 >= args.len() {
                    eprintln!("--connect requires a URL");
                    print_usage(&program);
                    std::process::exit(2);
                }
                connect_url = args[i + 1].clone();
                i += 2;
                continue;
            }
            "--token" => {
                if i + 1 >= args.len() {
                    eprintln!("--token requires a value");
                    print_usage(&program);
                    std::process::exit(2);
                }
                token = Some(args[i + 1].clone());
                i += 2;
                continue;
            }
            "--invoice" => {
                if i + 1 >= args.len() {
                    eprintln!("--invoice requires a value");
                    print_usage(&program);
                    std::process::exit(2);
                }
                invoice = Some(args[i + 1].clone());
                i += 2;
                continue;
            }
            "--phone" => {
                if i + 1 >= args.len() {
                    eprintln!("--phone requires a value");
                    print_usage(&program);
                    std::process::exit(2);
                }
                phone = Some(args[i + 1].clone());
                i += 2;
                continue;
            }
            "--repl" => {
                repl = true;
                i += 1;
                continue;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            _ => {
                // First non-flag token starts the command
                command = args[i..].to_vec();
                break;
            }
        }
    }

    let rt = tokio::runtime::Runtime::new()?;

    if !command.is_empty() && !repl {
        let session =
            establish(&rt, &connect_url, token.as_deref(), invoice.as_deref(), phone.as_deref())?;
        return run_command(&rt, &session, &command);
    }

    // Enter REPL, auto-connecting when credentials were given
    let mut session: Option<HttpSession> = None;
    if token.is_some() || (invoice.is_some() && phone.is_some()) {
        match establish(&rt, &connect_url, token.as_deref(), invoice.as_deref(), phone.as_deref()) {
            Ok(s) => {
                println!("connected to {}", connect_url);
                session = Some(s);
            }
            Err(e) => eprintln!("auto-connect failed: {}", e),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    println!("juronet-cli interpreter. Type 'help' for commands.");
    loop {
        input.clear();
        print!("> ");
        let _ = stdout.flush();
        if stdin.read_line(&mut input).is_err() {
            break;
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<String> = line.split_whitespace().map(String::from).collect();
        match parts[0].as_str() {
            "quit" | "exit" => break,
            "help" => {
                print_usage(&program);
            }
            "status" => match &session {
                Some(s) => println!("connected: {}", s.base()),
                None => println!("not connected"),
            },
            "connect" => {
                if parts.len() < 4 {
                    eprintln!("usage: connect <url> token <t> | connect <url> customer <invoice> <phone>");
                    continue;
                }
                let url = &parts[1];
                let attempt = match parts[2].as_str() {
                    "token" => establish(&rt, url, Some(&parts[3]), None, None),
                    "customer" if parts.len() >= 5 => {
                        establish(&rt, url, None, Some(&parts[3]), Some(&parts[4]))
                    }
                    _ => {
                        eprintln!("usage: connect <url> token <t> | connect <url> customer <invoice> <phone>");
                        continue;
                    }
                };
                match attempt {
                    Ok(s) => {
                        println!("connected to {}", url);
                        session = Some(s);
                    }
                    Err(e) => eprintln!("connect failed: {}", e),
                }
            }
            "disconnect" | "logout" => {
                if let Some(s) = &session {
                    let _ = rt.block_on(s.logout());
                    session = None;
                    println!("signed out");
                } else {
                    println!("not connected");
                }
            }
            _ => match &session {
                Some(s) => {
                    if let Err(e) = run_command(&rt, s, &parts) {
                        eprintln!("error: {}", e);
                    }
                }
                None => eprintln!(
                    "not connected; use: connect <url> token <t> | connect <url> customer <invoice> <phone>"
                ),
            },
        }
    }
    Ok(())
}
