use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use entity_domain::{Catalog, SchemaValidator};
use resource::{InMemoryStore, NoHooks, Payload, ResourceService};
use resource_rest::{Principal, RestController, RestRequest, RestResponse, RoleHierarchyPolicy};
use serde_json::{json, Value};

mod config;

use config::AppConfig;

type Controller = RestController<InMemoryStore, NoHooks>;

/// Consola interactiva para administrar usuarios, grupos y libros sobre un
/// store en memoria, pasando por el adaptador REST.
///
/// Opciones soportadas:
/// 1) Listar grupos
/// 2) Crear grupo
/// 3) Renombrar grupo
/// 4) Eliminar grupo
/// 5) Listar usuarios
/// 6) Crear usuario
/// 7) Asignar usuario a grupo
/// 8) Buscar libros
/// 9) Salir
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = AppConfig::from_env()?;
    let principal = config.principal();

    let store = Arc::new(InMemoryStore::new());
    let registry = Arc::new(Catalog::registry());
    registry.check_consistency()?;
    let policy = Arc::new(RoleHierarchyPolicy::default());
    let controller = |kind: &str| -> Result<Controller, resource::ResourceError> {
        let service = ResourceService::new(store.clone(), registry.clone(), kind, Arc::new(SchemaValidator))?;
        Ok(RestController::new(Arc::new(service), policy.clone()))
    };
    let groups = controller("user_group")?;
    let users = controller("user")?;
    let books = controller("book")?;

    if config.seed {
        seed(&store, &registry)?;
        log::info!("datos de ejemplo cargados");
    }

    loop {
        println!("\n== Resource CLI ==");
        println!("1) Listar grupos");
        println!("2) Crear grupo");
        println!("3) Renombrar grupo");
        println!("4) Eliminar grupo");
        println!("5) Listar usuarios");
        println!("6) Crear usuario");
        println!("7) Asignar usuario a grupo");
        println!("8) Buscar libros");
        println!("9) Salir");

        let choice = prompt("Elige una opción: ")?;
        let request = match choice.trim() {
            "1" => (&groups, RestRequest::find().with_query("order", "name")),
            "2" => {
                let name = prompt("Nombre del grupo: ")?;
                let role = prompt("Rol (enter para ROLE_USER): ")?;
                let role = if role.trim().is_empty() { "ROLE_USER" } else { role.trim() };
                (&groups, RestRequest::create(json!({"name": name.trim(), "role": role}).to_string()))
            }
            "3" => {
                let id = prompt("Id del grupo: ")?;
                let name = prompt("Nuevo nombre: ")?;
                (&groups, RestRequest::update(id.trim(), json!({"name": name.trim()}).to_string()))
            }
            "4" => {
                let id = prompt("Id del grupo a eliminar: ")?;
                let confirm = prompt(&format!("Confirma borrado de {}? escribir 'yes' para confirmar: ", id.trim()))?;
                if confirm.trim().to_lowercase() != "yes" {
                    println!("Borrado cancelado");
                    continue;
                }
                (&groups, RestRequest::delete(id.trim()))
            }
            "5" => (&users, RestRequest::find().with_query("order", "username")),
            "6" => {
                let username = prompt("Usuario: ")?;
                let email = prompt("Email: ")?;
                let body = json!({"username": username.trim(), "email": email.trim()});
                (&users, RestRequest::create(body.to_string()))
            }
            "7" => {
                let user_id = prompt("Id del usuario: ")?;
                let group_id = prompt("Id del grupo: ")?;
                match assign_request(&users, &principal, user_id.trim(), group_id.trim()) {
                    Some(request) => (&users, request),
                    None => continue,
                }
            }
            "8" => {
                let terms = prompt("Términos de búsqueda: ")?;
                (&books, RestRequest::find().with_query("search", terms.trim()))
            }
            "9" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other.trim());
                continue;
            }
        };

        let (target, request) = request;
        let request = match config.format {
            resource_rest::Format::Xml => request.accept("application/xml"),
            resource_rest::Format::Json => request,
        };
        print_response(&target.handle(&principal, &request));
    }

    Ok(())
}

/// Lee el usuario y arma la actualización que añade el grupo a los que ya
/// tiene. `None` si el usuario no se pudo leer.
fn assign_request(users: &Controller, principal: &Principal, user_id: &str, group_id: &str) -> Option<RestRequest> {
    let current = users.handle(principal, &RestRequest::find_one(user_id));
    if !current.status.is_success() {
        print_response(&current);
        return None;
    }
    let mut ids: Vec<Value> = current.json()["userGroups"].as_array().cloned().unwrap_or_default();
    ids.push(Value::String(group_id.to_string()));
    let mut request = RestRequest::update(user_id, json!({ "userGroups": ids }).to_string());
    if let Some(tag) = current.header(resource_rest::response::ETAG) {
        request = request.if_match(tag);
    }
    Some(request)
}

fn print_response(response: &RestResponse) {
    println!("[{}] {}", response.status, response.content_type);
    match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.body.clone())),
        Err(_) => println!("{}", response.body),
    }
}

/// Carga grupos, usuarios, autores y libros de ejemplo.
fn seed(store: &Arc<InMemoryStore>, registry: &Arc<entity_domain::SchemaRegistry>) -> Result<(), Box<dyn Error>> {
    let service = |kind: &str| ResourceService::new(store.clone(), registry.clone(), kind, Arc::new(SchemaValidator));
    let groups = service("user_group")?;
    let users = service("user")?;
    let authors = service("author")?;
    let books = service("book")?;

    let admins = groups.create(Payload::new().with("name", "Administradores").with("role", "ROLE_ADMIN"))?;
    let readers = groups.create(Payload::new().with("name", "Lectores").with("role", "ROLE_USER"))?;
    users.create(Payload::new().with("username", "admin")
                               .with("email", "admin@example.org")
                               .with("userGroups", json!([admins.id().to_json(), readers.id().to_json()])))?;

    let le_guin = authors.create(Payload::new().with("name", "Ursula K. Le Guin"))?;
    let herbert = authors.create(Payload::new().with("name", "Frank Herbert"))?;
    for (title, description, author) in [("Los desposeídos", "Una utopía ambigua", &le_guin),
                                         ("Un mago de Terramar", "Escuela de magia en un archipiélago", &le_guin),
                                         ("Dune", "Política y especia en Arrakis", &herbert)]
    {
        books.create(Payload::new().with("title", title)
                                   .with("description", description)
                                   .with("author", author.id().to_json()))?;
    }
    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
