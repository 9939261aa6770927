use std::{env, fs, path::Path};

use ts_rs::TS;

// `TreeNode` flattens its record, which ts-rs cannot express generically.
const TREE_TYPES: &str = "export type PersonNode = Person & { children: Array<PersonNode> };\n\nexport type FamilyForest = Array<PersonNode>;";

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`. Do not edit by hand.";
    let decls = [
        db::models::person::Gender::decl(),
        db::models::person::MaritalStatus::decl(),
        db::models::person::Person::decl(),
        db::models::person::PersonDraft::decl(),
        utils::response::ApiResponse::<()>::decl(),
        server::routes::health::Health::decl(),
        server::routes::tree::TreeStats::decl(),
        server::routes::auth::LoginRequest::decl(),
        server::routes::auth::LoginResponse::decl(),
    ];
    let body = decls
        .into_iter()
        .map(|decl| format!("export {}", decl.trim_start_matches("export ")))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{header}\n\n{body}\n\n{TREE_TYPES}\n")
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&shared_path).unwrap_or_default();
        if current == generated {
            println!("✅ shared/types.ts is up to date.");
            std::process::exit(0);
        }
        eprintln!("❌ shared/types.ts is out of date. Run `cargo run --bin generate_types`.");
        std::process::exit(1);
    }

    if let Some(parent) = shared_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("failed to create {}: {e}", parent.display());
            std::process::exit(1);
        }
    }
    if let Err(e) = fs::write(&shared_path, generated) {
        eprintln!("failed to write {}: {e}", shared_path.display());
        std::process::exit(1);
    }
    println!("Wrote {}", shared_path.display());
}
