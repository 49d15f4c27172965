//! Demo schools so a fresh install has something to browse.

use chrono::{Duration, Utc};
use log::info;

use crate::auth::hash_password;
use crate::db::Store;
use crate::models::{NewInstructor, NewSchool, NewService, NewUser, NewVehicle, Role, Transmission};

/// Password shared by every seeded school account.
pub const DEMO_PASSWORD: &str = "drivebook-demo";

struct DemoService {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    price: f64,
    duration: i32,
}

struct DemoVehicle {
    brand: &'static str,
    model: &'static str,
    year: i32,
    plate_number: &'static str,
    transmission: Transmission,
}

struct DemoSchool {
    username: &'static str,
    owner_name: &'static str,
    school_name: &'static str,
    description: &'static str,
    location: &'static str,
    contact_phone: &'static str,
    verified: bool,
    rating: f64,
    services: &'static [DemoService],
    instructors: &'static [(&'static str, &'static str, &'static str)],
    vehicles: &'static [DemoVehicle],
}

const DEMO_SCHOOLS: &[DemoSchool] = &[
    DemoSchool {
        username: "highveld_driving",
        owner_name: "Thabo Nkosi",
        school_name: "Highveld Driving Academy",
        description: "K53 lessons and test preparation across Johannesburg's northern suburbs.",
        location: "Johannesburg, Gauteng",
        contact_phone: "0115550123",
        verified: true,
        rating: 4.7,
        services: &[
            DemoService {
                name: "Code 8 Lesson",
                description: "One hour light motor vehicle lesson.",
                category: "lessons",
                price: 350.0,
                duration: 60,
            },
            DemoService {
                name: "Code 10 Lesson",
                description: "One hour heavy vehicle lesson.",
                category: "lessons",
                price: 450.0,
                duration: 60,
            },
            DemoService {
                name: "K53 Test Preparation",
                description: "Yard test and route practice before the licence test.",
                category: "test-prep",
                price: 1200.0,
                duration: 180,
            },
        ],
        instructors: &[
            ("Sipho Dlamini", "GP-INS-20481", "8506155012089"),
            ("Naledi Molefe", "GP-INS-31177", "9002270445081"),
        ],
        vehicles: &[
            DemoVehicle {
                brand: "Toyota",
                model: "Corolla Quest",
                year: 2021,
                plate_number: "HV 21 GP",
                transmission: Transmission::Manual,
            },
            DemoVehicle {
                brand: "Volkswagen",
                model: "Polo Vivo",
                year: 2022,
                plate_number: "HV 22 GP",
                transmission: Transmission::Automatic,
            },
        ],
    },
    DemoSchool {
        username: "table_mountain_drivers",
        owner_name: "Anele Jacobs",
        school_name: "Table Mountain Drivers",
        description: "Patient instructors for nervous first-time drivers in the City Bowl.",
        location: "Cape Town, Western Cape",
        contact_phone: "0215550456",
        verified: true,
        rating: 4.5,
        services: &[
            DemoService {
                name: "Beginner Lesson",
                description: "Parking lot basics and clutch control.",
                category: "lessons",
                price: 320.0,
                duration: 60,
            },
            DemoService {
                name: "Ten Lesson Package",
                description: "Ten one hour lessons at a discounted rate.",
                category: "packages",
                price: 2900.0,
                duration: 600,
            },
        ],
        instructors: &[("Ruan van der Merwe", "WC-INS-11820", "8811025123087")],
        vehicles: &[DemoVehicle {
            brand: "Suzuki",
            model: "Swift",
            year: 2023,
            plate_number: "CA 123 456",
            transmission: Transmission::Manual,
        }],
    },
    DemoSchool {
        username: "umhlanga_driving",
        owner_name: "Priya Naidoo",
        school_name: "Umhlanga Driving School",
        description: "Lessons along the North Coast with automatic and manual cars.",
        location: "Durban, KwaZulu-Natal",
        contact_phone: "0315550789",
        verified: false,
        rating: 4.2,
        services: &[
            DemoService {
                name: "Automatic Lesson",
                description: "One hour lesson in an automatic hatchback.",
                category: "lessons",
                price: 380.0,
                duration: 60,
            },
            DemoService {
                name: "Refresher Course",
                description: "Two hours for licensed drivers getting back on the road.",
                category: "refresher",
                price: 650.0,
                duration: 120,
            },
        ],
        instructors: &[("Zanele Mthembu", "KZN-INS-40912", "9107140876083")],
        vehicles: &[DemoVehicle {
            brand: "Hyundai",
            model: "i20",
            year: 2020,
            plate_number: "ND 456 789",
            transmission: Transmission::Automatic,
        }],
    },
    DemoSchool {
        username: "jacaranda_motor",
        owner_name: "Pieter Botha",
        school_name: "Jacaranda Motor School",
        description: "Family run school in Pretoria East since 1998.",
        location: "Pretoria, Gauteng",
        contact_phone: "0125550321",
        verified: false,
        rating: 3.9,
        services: &[DemoService {
            name: "Code 8 Lesson",
            description: "One hour lesson in a manual sedan.",
            category: "lessons",
            price: 300.0,
            duration: 60,
        }],
        instructors: &[("Johan Pretorius", "GP-INS-50233", "7603035098084")],
        vehicles: &[DemoVehicle {
            brand: "Toyota",
            model: "Etios",
            year: 2019,
            plate_number: "JMS 001 GP",
            transmission: Transmission::Manual,
        }],
    },
];

/// Inserts the demo schools when none exist yet, or always with `force`.
/// Accounts whose username is already taken are skipped so re-runs stay idempotent.
pub async fn seed_data(
    store: &dyn Store,
    force: bool,
    bcrypt_cost: u32,
) -> Result<usize, Box<dyn std::error::Error>> {
    let existing = store.count_schools().await?;
    if existing > 0 && !force {
        info!("Found {} schools, skipping seed", existing);
        return Ok(0);
    }

    info!("Seeding demo driving schools...");
    let password_hash = hash_password(DEMO_PASSWORD, bcrypt_cost)?;
    let licence_expiry = Utc::now() + Duration::days(3 * 365);
    let mut seeded = 0;

    for demo in DEMO_SCHOOLS {
        if store.find_user_by_username(demo.username).await?.is_some() {
            info!("Demo account {} already exists, skipping", demo.username);
            continue;
        }

        let owner = store
            .create_user(NewUser {
                username: demo.username.to_string(),
                email: format!("{}@drivebook.co.za", demo.username),
                password_hash: password_hash.clone(),
                full_name: demo.owner_name.to_string(),
                phone_number: Some(demo.contact_phone.to_string()),
                address: Some(demo.location.to_string()),
                role: Role::School,
            })
            .await?;

        let school = store
            .create_school(NewSchool {
                user_id: owner.id,
                school_name: demo.school_name.to_string(),
                description: Some(demo.description.to_string()),
                location: demo.location.to_string(),
                contact_email: owner.email.clone(),
                contact_phone: demo.contact_phone.to_string(),
                photo_url: None,
                rating: demo.rating,
            })
            .await?;
        if demo.verified {
            store.set_school_verified(school.id, true).await?;
        }

        for service in demo.services {
            store
                .create_service(NewService {
                    school_id: school.id,
                    name: service.name.to_string(),
                    description: Some(service.description.to_string()),
                    category: service.category.to_string(),
                    price: service.price,
                    duration: service.duration,
                })
                .await?;
        }

        for (name, license_number, id_number) in demo.instructors {
            store
                .create_instructor(NewInstructor {
                    school_id: school.id,
                    name: name.to_string(),
                    license_number: license_number.to_string(),
                    license_expiry: licence_expiry,
                    id_number: id_number.to_string(),
                    photo_url: None,
                })
                .await?;
        }

        for vehicle in demo.vehicles {
            store
                .create_vehicle(NewVehicle {
                    school_id: school.id,
                    brand: vehicle.brand.to_string(),
                    model: vehicle.model.to_string(),
                    year: Some(vehicle.year),
                    plate_number: vehicle.plate_number.to_string(),
                    transmission: vehicle.transmission,
                    photo_url: None,
                })
                .await?;
        }

        seeded += 1;
    }

    info!("Seeding complete with {} schools", seeded);
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{SchoolFilter, ServiceFilter};

    #[actix_web::test]
    async fn seeds_once() {
        let store = MemoryStore::new();
        assert_eq!(seed_data(&store, false, 4).await.unwrap(), DEMO_SCHOOLS.len());
        assert_eq!(seed_data(&store, false, 4).await.unwrap(), 0);
        // Forced re-runs skip accounts that already exist.
        assert_eq!(seed_data(&store, true, 4).await.unwrap(), 0);

        let schools = store.list_schools(&SchoolFilter::default()).await.unwrap();
        assert_eq!(schools.len(), DEMO_SCHOOLS.len());
        assert_eq!(schools[0].school_name, "Highveld Driving Academy");
        assert!(schools[0].verified);

        let services = store.list_services(&ServiceFilter::default()).await.unwrap();
        assert_eq!(services.first().map(|s| s.price), Some(300.0));
    }

    #[actix_web::test]
    async fn seeded_owners_can_log_in() {
        let store = MemoryStore::new();
        seed_data(&store, false, 4).await.unwrap();
        let owner = store
            .find_user_by_username("highveld_driving")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner.role, Role::School);
        assert!(crate::auth::verify_password(DEMO_PASSWORD, &owner.password_hash));
    }
}
