use std::env;
use std::io::{self, Write};
use std::process;

use chrono::Local;
use dojo_roster::backup::{backup_file_name, csv_file_name};
use dojo_roster::persistence::{
    read_backup_file, read_student_file, write_backup_file, write_csv_export_file,
};
use dojo_roster::{
    BackupService, CsvImporter, ExportKind, FileStore, PersistenceConfig, Roster, SchoolSnapshot,
    Student,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_PATH: &str = "dojo-roster.json";
const ERROR_DISPLAY_LIMIT: usize = 5;

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  status                             Show storage usage\n  list                               List stored students\n  import csv <path>                  Import students from a .csv/.txt file\n  import json <path>                 Restore a JSON backup\n  export json [path]                 Write a JSON backup\n  export csv <kind> [path]           Write students|classes|payments as CSV\n  backup                             Store a backup copy under the backup key\n  clear                              Remove all stored data\n  quit|exit                          Exit"
    );
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config() -> PersistenceConfig {
    match env::var("DOJO_ROSTER_CONFIG") {
        Ok(path) => match PersistenceConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error ({}): {}", path, e);
                process::exit(1);
            }
        },
        Err(_) => PersistenceConfig::default(),
    }
}

fn render_student_line(student: &Student) -> String {
    format!(
        "{}  {}  {}  {}",
        student.id, student.name, student.belt, student.status
    )
}

fn import_csv(service: &BackupService<FileStore>, path: &str) {
    let text = match read_student_file(path) {
        Ok(text) => text,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };
    let mut snapshot = service.load_initial_data();
    let mut roster = Roster::from_students(std::mem::take(&mut snapshot.students));
    let importer = CsvImporter::new(service.config());
    let report = importer.import_students(&text, &mut roster);
    if report.success == 0 {
        for message in report.display_errors(ERROR_DISPLAY_LIMIT) {
            println!("{}", message);
        }
        return;
    }
    snapshot.students = roster.students().to_vec();
    if !service.persist(&snapshot) {
        println!("Error: could not save students");
        return;
    }
    println!("{}", report.summary());
    for message in report.display_errors(ERROR_DISPLAY_LIMIT) {
        println!("{}", message);
    }
}

fn import_json(service: &BackupService<FileStore>, path: &str) {
    let text = match read_backup_file(path) {
        Ok(text) => text,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };
    match service.try_import_json(&text) {
        Ok(summary) => println!(
            "Backup imported: {} students, {} classes, {} payments",
            summary.students,
            summary.classes.unwrap_or(0),
            summary.payments.unwrap_or(0)
        ),
        Err(e) => println!("Import error: {}", e),
    }
}

fn export_json(service: &BackupService<FileStore>, path: Option<&str>) {
    let path = path
        .map(str::to_string)
        .unwrap_or_else(|| backup_file_name(Local::now().date_naive()));
    let backup = service.create_backup();
    match write_backup_file(&backup, &path) {
        Ok(()) => println!(
            "Exported {} records to {}",
            backup.metadata.total_records, path
        ),
        Err(e) => println!("Export error: {}", e),
    }
}

fn export_csv(service: &BackupService<FileStore>, kind: ExportKind, path: Option<&str>) {
    let path = path
        .map(str::to_string)
        .unwrap_or_else(|| csv_file_name(kind, Local::now().date_naive()));
    let contents = match service.export_csv(kind) {
        Ok(contents) => contents,
        Err(e) => {
            println!("Export error: {}", e);
            return;
        }
    };
    if contents.is_empty() {
        println!("No {} to export.", kind);
        return;
    }
    match write_csv_export_file(&contents, &path) {
        Ok(()) => println!("Exported {} to {}", kind, path),
        Err(e) => println!("Export error: {}", e),
    }
}

fn main() {
    init_tracing();
    let config = load_config();
    let data_path = env::var("DOJO_ROSTER_DATA").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());
    let store = match FileStore::new(&data_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Storage error ({}): {}", data_path, e);
            process::exit(1);
        }
    };
    let service = BackupService::new(store, config);

    println!("Dojo Roster (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "status" => {
                println!("Storage: {}", service.storage_status().to_cli_summary());
            }
            "list" => {
                let snapshot: SchoolSnapshot = service.load_initial_data();
                println!(
                    "{} students, {} classes, {} payments",
                    snapshot.students.len(),
                    snapshot.classes.len(),
                    snapshot.payments.len()
                );
                for student in &snapshot.students {
                    println!("{}", render_student_line(student));
                }
            }
            "import" => match (parts.next(), parts.next()) {
                (Some("csv"), Some(path)) => import_csv(&service, path),
                (Some("json"), Some(path)) => import_json(&service, path),
                _ => println!("Usage: import csv|json <path>"),
            },
            "export" => match parts.next() {
                Some("json") => export_json(&service, parts.next()),
                Some("csv") => match parts.next().map(str::parse::<ExportKind>) {
                    Some(Ok(kind)) => export_csv(&service, kind, parts.next()),
                    Some(Err(e)) => println!("Error: {}", e),
                    None => println!("Usage: export csv <students|classes|payments> [path]"),
                },
                _ => println!("Usage: export json [path] | export csv <kind> [path]"),
            },
            "backup" => {
                let backup = service.create_backup();
                println!("Backup stored ({} records).", backup.metadata.total_records);
            }
            "clear" => {
                if service.clear_all_data() {
                    println!("All data cleared.");
                } else {
                    println!("Error: some keys could not be removed");
                }
            }
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
