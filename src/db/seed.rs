use rusqlite::{params, Connection};

use crate::models::{Service, ServiceType};

/// The fixed service catalog. Seeded once on first startup; the booking
/// engine treats it as read-only afterwards.
fn catalog() -> Vec<Service> {
    vec![
        Service {
            id: "deep-cleaning".to_string(),
            name: "Deep Cleaning".to_string(),
            description: "Comprehensive cleaning of your entire home".to_string(),
            service_type: ServiceType::Project,
            icon: "House".to_string(),
        },
        Service {
            id: "kitchen-bathroom".to_string(),
            name: "Kitchen & Bathroom Cleaning".to_string(),
            description: "Specialized cleaning for kitchens and bathrooms".to_string(),
            service_type: ServiceType::Project,
            icon: "Wand".to_string(),
        },
        Service {
            id: "sofa-carpet".to_string(),
            name: "Sofa & Carpet Cleaning".to_string(),
            description: "Professional cleaning for upholstery and carpets".to_string(),
            service_type: ServiceType::Hourly,
            icon: "WashingMachine".to_string(),
        },
        Service {
            id: "laundry".to_string(),
            name: "Laundry Services".to_string(),
            description: "Wash, dry, and iron your clothes".to_string(),
            service_type: ServiceType::Project,
            icon: "Shirt".to_string(),
        },
        Service {
            id: "move-in-out".to_string(),
            name: "Move In/Out Cleaning".to_string(),
            description: "Complete cleaning before or after moving".to_string(),
            service_type: ServiceType::Project,
            icon: "Package".to_string(),
        },
    ]
}

pub fn seed_services(conn: &Connection) -> anyhow::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM services", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }

    for service in catalog() {
        conn.execute(
            "INSERT INTO services (id, name, description, service_type, icon)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                service.id,
                service.name,
                service.description,
                service.service_type.as_str(),
                service.icon,
            ],
        )?;
    }

    tracing::info!("seeded service catalog");
    Ok(())
}
