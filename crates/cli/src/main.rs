use std::io::{self, Write};

use bytes::Bytes;
use clap::Parser;

use gale_client::Client;
use gale_common::{ClientError, DEFAULT_ADDR, unix_now};
use gale_protocol::Value;

/// TTL aplicado quando `set` não recebe um.
const DEFAULT_TTL_SECS: u32 = 3600;

#[derive(Parser, Debug)]
#[command(name = "gale-cli", about = "GaleCache CLI client")]
struct Args {
    #[arg(long, default_value = DEFAULT_ADDR)]
    address: String,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = Client::new(args.address.clone());

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        println!("{}", execute(&client, &args.command).await);
        client.close().await;
        return Ok(());
    }

    println!("Conectado a {}", args.address);

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("gale> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        println!("{}", execute(&client, &tokens).await);
    }

    client.close().await;
    Ok(())
}

/// Executa um comando tokenizado e formata o resultado para exibição.
async fn execute(client: &Client, tokens: &[String]) -> String {
    let cmd = tokens[0].to_lowercase();
    match (cmd.as_str(), &tokens[1..]) {
        ("get", [key]) => match client.get(key).await {
            Ok(value) => format_value(&value),
            Err(ClientError::NotFound) => "(nil)".to_string(),
            Err(e) => format!("(error) {e}"),
        },
        ("set", [key, value]) => set(client, key, value, DEFAULT_TTL_SECS).await,
        ("set", [key, value, ttl]) => match ttl.parse::<u32>() {
            Ok(secs) => set(client, key, value, secs).await,
            Err(_) => format!("(error) ttl inválido: '{ttl}'"),
        },
        ("del", [key]) => match client.remove(key).await {
            Ok(()) => "OK".to_string(),
            Err(e) => format!("(error) {e}"),
        },
        ("keys", []) => match client.keys().await {
            Ok(keys) if keys.is_empty() => "(empty list)".to_string(),
            Ok(keys) => keys
                .iter()
                .enumerate()
                .map(|(i, k)| format!("{}) \"{k}\"", i + 1))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => format!("(error) {e}"),
        },
        _ => {
            "(error) uso: get <chave> | set <chave> <valor> [ttl-segundos] | del <chave> | keys"
                .to_string()
        }
    }
}

async fn set(client: &Client, key: &str, value: &str, ttl_secs: u32) -> String {
    let expired = unix_now().saturating_add(ttl_secs);
    let value = Value::new(expired, Bytes::copy_from_slice(value.as_bytes()));
    match client.add(key, value).await {
        Ok(()) => "OK".to_string(),
        Err(e) => format!("(error) {e}"),
    }
}

/// Formata um valor para exibição humana.
fn format_value(value: &Value) -> String {
    match std::str::from_utf8(&value.data) {
        Ok(s) => format!("\"{s}\""),
        Err(_) => format!("(binary) {} bytes", value.data.len()),
    }
}

/// Tokeniza a linha de input com suporte a strings quoted.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut quote_char = '"';
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quote {
            if c == quote_char {
                in_quote = false;
            } else if c == '\\' {
                if let Some(&next) = chars.peek() {
                    match next {
                        'n' => {
                            current.push('\n');
                            chars.next();
                        }
                        't' => {
                            current.push('\t');
                            chars.next();
                        }
                        '\\' => {
                            current.push('\\');
                            chars.next();
                        }
                        '"' => {
                            current.push('"');
                            chars.next();
                        }
                        '\'' => {
                            current.push('\'');
                            chars.next();
                        }
                        _ => current.push(c),
                    }
                }
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quote = true;
            quote_char = c;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
