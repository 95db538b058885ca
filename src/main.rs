use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use serde_json::json;
use smart_mail_agent::config_loader::{RuleLoader, RuleSource};
use smart_mail_agent::{label_email, EmailMessage, IntentClassifier, RuleSet, SpamAction, SpamLabel};
use std::process;

fn main() {
    let matches = Command::new("smart-mail-agent")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rule-based spam screening and intent classification for incoming mail")
        .arg(
            Arg::new("rules")
                .short('c')
                .long("rules")
                .value_name("FILE")
                .help("Spam rule file (default: $SMART_MAIL_RULES or config/spam_rules.yaml)"),
        )
        .arg(
            Arg::new("sender")
                .long("sender")
                .value_name("ADDRESS")
                .help("Sender address"),
        )
        .arg(
            Arg::new("subject")
                .long("subject")
                .value_name("TEXT")
                .help("Subject line"),
        )
        .arg(
            Arg::new("content")
                .long("content")
                .value_name("TEXT")
                .help("Message body"),
        )
        .arg(
            Arg::new("attachment")
                .long("attachment")
                .value_name("NAME")
                .help("Attachment filename (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .value_name("FILE")
                .help("JSON file with sender/subject/content/attachments; flags override it"),
        )
        .arg(
            Arg::new("intent")
                .long("intent")
                .help("Also classify the business intent of the message")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the JSON result to FILE instead of stdout"),
        )
        .arg(
            Arg::new("generate-rules")
                .long("generate-rules")
                .value_name("FILE")
                .help("Write the built-in rule set to FILE and exit"),
        )
        .arg(
            Arg::new("test-rules")
                .long("test-rules")
                .help("Check that the rule file parses and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging of every scoring signal")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-rules") {
        generate_default_rules(path);
        return;
    }

    let mut loader = match matches.get_one::<String>("rules") {
        Some(path) => RuleLoader::new(path),
        None => RuleLoader::from_env(),
    };

    if matches.get_flag("test-rules") {
        test_rules(&mut loader);
        return;
    }

    let email = match build_email(&matches) {
        Ok(email) => email,
        Err(e) => {
            eprintln!("Error reading input: {e:#}");
            process::exit(1);
        }
    };

    if email.is_empty() {
        eprintln!("No message given. Use --subject/--content/--sender/--attachment or --input FILE.");
        process::exit(2);
    }

    let rules = loader.load(false);
    let score = label_email(&rules, &email);
    // Without a model the suspect tier is the one that needs a human
    let action = SpamAction::decide(score.label == SpamLabel::Spam, score.label == SpamLabel::Suspect);

    let mut result = json!({
        "label": score.label,
        "is_spam": score.label == SpamLabel::Spam,
        "score": score.score,
        "normalized_score": score.normalized(&rules.thresholds),
        "reasons": score.reasons,
        "whitelisted": score.whitelisted,
        "action": action,
    });

    if matches.get_flag("intent") {
        let intent = IntentClassifier::new().classify(&email.subject, &email.content);
        result["intent"] = json!({
            "label": intent.label,
            "confidence": intent.confidence,
            "action": intent.label.action_name(),
        });
    }

    let rendered = match serde_json::to_string_pretty(&result) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("Error rendering result: {e}");
            process::exit(1);
        }
    };

    match matches.get_one::<String>("output") {
        Some(path) => {
            if let Err(e) = std::fs::write(path, format!("{rendered}\n")) {
                eprintln!("Error writing {path}: {e}");
                process::exit(1);
            }
            log::info!("Result written to {path}");
        }
        None => println!("{rendered}"),
    }
}

fn build_email(matches: &ArgMatches) -> anyhow::Result<EmailMessage> {
    let mut email = match matches.get_one::<String>("input") {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {path}"))?;
            serde_json::from_str::<EmailMessage>(&content)
                .with_context(|| format!("{path} is not a valid message JSON object"))?
        }
        None => EmailMessage::default(),
    };

    if let Some(sender) = matches.get_one::<String>("sender") {
        email.sender = sender.clone();
    }
    if let Some(subject) = matches.get_one::<String>("subject") {
        email.subject = subject.clone();
    }
    if let Some(content) = matches.get_one::<String>("content") {
        email.content = content.clone();
    }
    if let Some(attachments) = matches.get_many::<String>("attachment") {
        email.attachments = attachments.cloned().collect();
    }

    Ok(email)
}

fn test_rules(loader: &mut RuleLoader) {
    println!("Testing rule file: {}", loader.path().display());
    let rules = loader.load(true);

    match loader.source() {
        Some(RuleSource::File) => println!("Rule file parsed successfully."),
        Some(RuleSource::Defaults) => println!("Rule file not found; built-in defaults apply."),
        Some(RuleSource::Invalid(reason)) => {
            println!("Rule file is invalid: {reason}");
            println!("Built-in defaults would be used instead.");
            process::exit(1);
        }
        None => {}
    }

    println!("Keywords: {}", rules.keywords.len());
    println!("Suspicious domains: {}", rules.suspicious_domains.len());
    println!("Suspicious TLDs: {}", rules.suspicious_tlds.len());
    println!("Bad extensions: {}", rules.bad_extensions.len());
    println!("Whitelisted domains: {}", rules.whitelist_domains.len());
    println!(
        "Thresholds: suspect >= {}, spam >= {}",
        rules.thresholds.suspect, rules.thresholds.spam
    );
}

fn generate_default_rules(path: &str) {
    match RuleSet::default().to_file(path) {
        Ok(()) => {
            println!("Default rule file written to: {path}");
            println!("Edit keywords, domains and thresholds to suit your mail flow.");
        }
        Err(e) => {
            eprintln!("Error writing rule file: {e}");
            process::exit(1);
        }
    }
}
