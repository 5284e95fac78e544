use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use flow_engine::stubs::InMemoryStorage;
use flow_engine::NoopAnalytics;
use flow_registration::flows::{registration_config, registration_flow};
use flow_registration::InMemoryAccounts;
use serde_json::json;

/// Pequeño asistente interactivo que recorre el flujo de registro usando
/// colaboradores en memoria (directorio de cuentas y storage).
///
/// Opciones soportadas:
/// 1) Ver paso actual (campos, errores y acciones disponibles)
/// 2) Cargar un campo del paso
/// 3) Siguiente paso
/// 4) Paso anterior
/// 5) Saltar paso
/// 6) Ir a un paso por id
/// 7) Completar registro
/// 8) Guardar ahora
/// 9) Ver datos acumulados
/// 10) Salir
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let accounts = Arc::new(InMemoryAccounts::new());
    let storage = Arc::new(InMemoryStorage::new());
    let flow = registration_flow(registration_config(),
                                 accounts.clone(),
                                 accounts.clone(),
                                 storage,
                                 Arc::new(NoopAnalytics))?;
    flow.mount().await?;

    loop {
        println!("\n== Asistente de registro ==");
        println!("1) Ver paso actual");
        println!("2) Cargar un campo");
        println!("3) Siguiente paso");
        println!("4) Paso anterior");
        println!("5) Saltar paso");
        println!("6) Ir a un paso por id");
        println!("7) Completar registro");
        println!("8) Guardar ahora");
        println!("9) Ver datos acumulados");
        println!("10) Salir");
        print!("Elige una opción: ");
        io::stdout().flush().ok();

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;
        match choice.trim() {
            "1" => {
                let ctx = flow.context();
                println!("\nPaso actual: {}", ctx.current_step.id());
                if ctx.current_step.fields().is_empty() {
                    println!("Sin campos: revisá y completá.");
                } else {
                    for field in ctx.current_step.fields() {
                        let value = flow.get_data(field).unwrap_or(json!(null));
                        match ctx.state.errors.get(field) {
                            Some(e) => println!("  {} = {} [{}]", field, value, e),
                            None => println!("  {} = {}", field, value),
                        }
                    }
                }
                println!("atrás: {} | saltar: {} | último: {}",
                         ctx.can_go_back,
                         ctx.can_skip,
                         ctx.is_last_step);
            }
            "2" => {
                let key = prompt("Campo: ")?;
                let value = prompt("Valor: ")?;
                flow.set_data(key.trim().to_string(), json!(value.trim()));
                match flow.validate_field(key.trim()).await {
                    Ok(true) => println!("OK"),
                    Ok(false) => {
                        if let Some(e) = flow.state().errors.get(key.trim()) {
                            println!("Inválido: {}", e);
                        }
                    }
                    Err(e) => eprintln!("Campo desconocido: {}", e),
                }
            }
            "3" => match flow.next().await {
                Ok(true) => println!("Avanzaste a: {}", flow.current_step().id()),
                Ok(false) => {
                    if flow.state().is_completed() {
                        println!("El flujo ya terminó.");
                    } else {
                        println!("No se pudo avanzar:");
                        for (field, message) in flow.state().errors {
                            println!("  {}: {}", field, message);
                        }
                    }
                }
                Err(e) => eprintln!("Error al avanzar: {}", e),
            },
            "4" => match flow.previous().await {
                Ok(true) => println!("Volviste a: {}", flow.current_step().id()),
                Ok(false) => println!("Ya estás en el primer paso."),
                Err(e) => eprintln!("Error al retroceder: {}", e),
            },
            "5" => match flow.skip().await {
                Ok(true) => println!("Paso saltado; ahora: {}", flow.current_step().id()),
                Ok(false) => println!("Este paso no se puede saltar."),
                Err(e) => eprintln!("Error al saltar: {}", e),
            },
            "6" => {
                let id = prompt("Id del paso (personal/security/review): ")?;
                match flow.jump_to(id.trim()).await {
                    Ok(true) => println!("Ahora en: {}", flow.current_step().id()),
                    Ok(false) => println!("No se pudo saltar."),
                    Err(e) => eprintln!("Paso desconocido: {}", e),
                }
            }
            "7" => match flow.complete().await {
                Ok(true) => {
                    println!("Registro completado: cuenta creada.");
                    break;
                }
                Ok(false) => println!("Todavía no se puede completar (faltan pasos o hay errores)."),
                Err(e) => eprintln!("La creación de la cuenta falló, reintentá: {}", e),
            },
            "8" => match flow.save_state().await {
                Ok(()) => println!("Progreso guardado."),
                Err(e) => eprintln!("No se pudo guardar: {}", e),
            },
            "9" => {
                let state = flow.state();
                println!("Sesión {} | paso {} | historial {:?}",
                         state.session_id,
                         state.current_step_index,
                         state.step_history);
                for (key, value) in state.data {
                    println!("  {} = {}", key, value);
                }
            }
            "10" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    flow.unmount().await;
    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
