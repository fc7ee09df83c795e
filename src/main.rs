// ==========================================
// Blood Bank Allocation - command line entry
// ==========================================
// Usage:
//   blood-bank-allocation [--db <path>] <command> [args]
//
// Commands:
//   init                                     create tables
//   submit <patient> <type> <units> [hosp]   create a Pending request (type e.g. B+)
//   fulfill <request_id>                     allocate, deduct and confirm
//   preview <request_id>                     read-only candidate units
//   show <request_id>                        request + allocation log
//   list [Pending|Confirmed]                 requests, newest first
//   inventory                                remaining units per blood type
//   set-config <key> <value>                 write a config_kv entry
//   show-config                              stored config_kv entries as JSON
//
// Output is JSON on stdout; logs go to stderr (RUST_LOG, LOG_FORMAT=json)
// ==========================================

use anyhow::{anyhow, bail, Context};
use blood_bank_allocation::config::ConfigManager;
use blood_bank_allocation::db::{default_db_path, init_schema, open_sqlite_connection};
use blood_bank_allocation::engine::OptionalEventPublisher;
use blood_bank_allocation::{logging, BloodType, NewBloodRequest, RequestApi, RequestStatus};
use serde::Serialize;

const USAGE: &str = "usage: blood-bank-allocation [--db <path>] \
<init|submit|fulfill|preview|show|list|inventory|set-config|show-config> [args]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let db_path = match args.iter().position(|a| a == "--db") {
        Some(idx) => {
            if idx + 1 >= args.len() {
                bail!("--db requires a path");
            }
            let path = args.remove(idx + 1);
            args.remove(idx);
            path
        }
        None => default_db_path(),
    };

    let mut args = args.into_iter();
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let rest: Vec<String> = args.collect();

    tracing::info!(version = blood_bank_allocation::VERSION, db = %db_path, %command, "{}", blood_bank_allocation::APP_NAME);

    // every command works on an initialized schema
    {
        let conn = open_sqlite_connection(&db_path)
            .with_context(|| format!("cannot open database {}", db_path))?;
        init_schema(&conn).context("schema initialization failed")?;
    }

    if command == "init" {
        println!("initialized {}", db_path);
        return Ok(());
    }

    if command == "set-config" {
        let [key, value] = rest.as_slice() else {
            bail!("usage: set-config <key> <value>");
        };
        let config = ConfigManager::new(&db_path).map_err(|e| anyhow!(e.to_string()))?;
        config
            .set_global_config_value(key, value)
            .map_err(|e| anyhow!(e.to_string()))?;
        println!("{}={}", key, value);
        return Ok(());
    }

    if command == "show-config" {
        let config = ConfigManager::new(&db_path).map_err(|e| anyhow!(e.to_string()))?;
        let snapshot = config.get_config_snapshot().map_err(|e| anyhow!(e.to_string()))?;
        println!("{}", snapshot);
        return Ok(());
    }

    let api = RequestApi::open(&db_path, OptionalEventPublisher::none())?;

    match command.as_str() {
        "submit" => {
            if rest.len() < 3 {
                bail!("usage: submit <patient_name> <blood_type> <units> [hospital]");
            }
            let blood_type: BloodType = rest[1].parse()?;
            let units_requested: u32 = rest[2]
                .parse()
                .with_context(|| format!("units must be a positive integer, got {:?}", rest[2]))?;

            let request_id = api.submit_request(NewBloodRequest {
                patient_name: rest[0].clone(),
                hospital_admitted: rest.get(3).cloned(),
                patient_blood_type: blood_type.abo,
                rh_factor: blood_type.rh,
                units_requested,
            })?;
            print_json(&serde_json::json!({ "request_id": request_id }))
        }
        "fulfill" => {
            let result = api.fulfill_request(parse_request_id(&rest)?).await?;
            print_json(&result)
        }
        "preview" => {
            let candidates = api.preview_candidates(parse_request_id(&rest)?).await?;
            print_json(&candidates)
        }
        "show" => {
            let request_id = parse_request_id(&rest)?;
            let request = api.get_request(request_id)?;
            let allocations = api.list_allocations(request_id)?;
            print_json(&serde_json::json!({
                "request": request,
                "allocations": allocations,
            }))
        }
        "list" => {
            let status = match rest.first() {
                Some(raw) => Some(
                    RequestStatus::parse(raw).ok_or_else(|| anyhow!("unknown status {:?}", raw))?,
                ),
                None => None,
            };
            print_json(&api.list_requests(status)?)
        }
        "inventory" => print_json(&api.inventory_summary()?),
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    }
}

fn parse_request_id(rest: &[String]) -> anyhow::Result<i64> {
    let raw = rest.first().ok_or_else(|| anyhow!("missing <request_id>"))?;
    raw.parse()
        .with_context(|| format!("request_id must be an integer, got {:?}", raw))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
