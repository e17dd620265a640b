//! Built-in keyword-differentiated training set
//!
//! 45 hand-written projects, 15 per tier, with progress and creation dates
//! chosen so the three classes are clearly separated. Useful to bootstrap a
//! model before real outcome data exists.

use crate::error::{Result, SuccessError};
use chrono::{Duration, NaiveDate};

/// (description, progress, days before `today`)
type SampleRow = (&'static str, i64, i64);

const LOW_SAMPLES: &[SampleRow] = &[
    ("Idea inicial sin desarrollo ni equipo", 2, 5),
    ("Concepto básico exploratorio en fase de investigación", 5, 10),
    ("Investigación de mercado sin prototipo ni clientes", 8, 15),
    ("Proyecto personal sin validación ni plan de negocio", 10, 8),
    ("Brainstorming inicial sobre posible emprendimiento", 3, 3),
    ("Fase de exploración sin recursos ni equipo formado", 7, 12),
    ("Idea sin desarrollo técnico en fase conceptual", 4, 7),
    ("Emprendimiento inicial sin validación de mercado", 12, 20),
    ("Concepto teórico sin pruebas ni clientes potenciales", 6, 5),
    ("Proyecto en etapa de ideación sin prototipo", 9, 14),
    ("Investigación preliminar sin avance tangible", 11, 18),
    ("Idea básica sin modelo de negocio definido", 5, 6),
    ("Exploración de oportunidad sin desarrollo real", 8, 9),
    ("Concepto inicial sin recursos asignados", 3, 4),
    ("Fase de descubrimiento sin equipo ni plan", 7, 11),
];

const MEDIUM_SAMPLES: &[SampleRow] = &[
    ("Prototipo funcional con 20 usuarios de prueba y feedback positivo, equipo de 3 personas", 55, 60),
    ("MVP desarrollado con modelo de negocio definido, buscando financiamiento inicial", 60, 70),
    ("Aplicación en testing beta con 50 usuarios activos y métricas de uso", 50, 65),
    ("Desarrollo activo del producto con primeros clientes y feedback iterativo", 58, 75),
    ("Prototipo validado con equipo formado, realizando pruebas de mercado", 52, 68),
    ("MVP en desarrollo con modelo de negocio y pitch deck preparado", 48, 72),
    ("Producto funcional con 30 usuarios de prueba y primeras ventas piloto", 62, 80),
    ("Aplicación con funcionalidades básicas, equipo técnico y búsqueda de inversión", 54, 77),
    ("Prototipo avanzado con feedback de clientes y mejoras iterativas", 56, 85),
    ("Desarrollo con equipo completo, modelo de negocio en validación", 50, 90),
    ("MVP funcional con 40 usuarios beta y métricas de engagement positivas", 58, 95),
    ("Producto en testing con primeros ingresos y modelo de monetización", 64, 100),
    ("Aplicación funcional con equipo de 4 personas y búsqueda activa de funding", 52, 82),
    ("Prototipo validado con 25 clientes de prueba y plan de lanzamiento", 60, 88),
    ("Desarrollo activo con modelo de negocio iterado y primeras ventas", 55, 92),
];

const HIGH_SAMPLES: &[SampleRow] = &[
    ("500 clientes activos generando $50K MRR con crecimiento del 25% mensual, equipo de 12 personas", 92, 120),
    ("Startup con funding de $2M, 15 empleados, mercado validado y expansión a 3 ciudades", 88, 150),
    ("Producto con 5000 usuarios activos, ingresos recurrentes de $80K mensuales y profitability", 90, 140),
    ("Plataforma con 1000 clientes pagantes, $100K MRR, crecimiento 30% mensual, 20 empleados", 95, 160),
    ("SaaS con 800 suscriptores activos, $60K MRR, churn rate 5%, equipo de 18 personas", 87, 135),
    ("Empresa establecida con $150K ingresos mensuales, 25 empleados, expansión regional", 93, 170),
    ("Startup con 2000 usuarios activos, funding Serie A de $3M, crecimiento acelerado", 89, 145),
    ("Producto líder en nicho con 1500 clientes, $120K MRR, equipo de 30 personas", 94, 180),
    ("Plataforma con 3000 usuarios, ingresos recurrentes $90K mensuales, profitability alcanzada", 91, 155),
    ("SaaS con 600 clientes corporativos, $110K MRR, expansión internacional iniciada", 88, 165),
    ("Empresa con $200K mensuales, 35 empleados, validación en múltiples mercados", 96, 190),
    ("Startup con tracción comprobada, $75K MRR, crecimiento 40% mensual, funding asegurado", 90, 148),
    ("Producto con 4000 usuarios activos, $85K MRR, equipo de 22 personas, scaling", 92, 142),
    ("Plataforma establecida con 1200 clientes pagantes, $95K MRR, expansión a nuevos verticales", 89, 175),
    ("SaaS con 900 suscriptores, $70K MRR, retención 90%, equipo de 16 personas", 87, 138),
];

pub const SAMPLE_ROWS_PER_CLASS: usize = 15;

/// Render the sample set as a training CSV with dates relative to `today`
pub fn generate_sample_csv(today: NaiveDate) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["description", "progress", "created_at", "outcome"])?;

    let tiers = [
        (LOW_SAMPLES, "Bajo éxito"),
        (MEDIUM_SAMPLES, "Medio éxito"),
        (HIGH_SAMPLES, "Alto éxito"),
    ];
    for (rows, outcome) in tiers {
        for (description, progress, days_ago) in rows {
            let created = today - Duration::days(*days_ago);
            writer.write_record([
                description.to_string(),
                progress.to_string(),
                created.format("%Y-%m-%d").to_string(),
                outcome.to_string(),
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SuccessError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))?;
    String::from_utf8(bytes).map_err(|e| SuccessError::Input(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{TrainingDataset, UnknownLabelPolicy};

    #[test]
    fn test_sample_csv_loads_balanced() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let csv = generate_sample_csv(today).unwrap();
        assert!(csv.starts_with("description,progress,created_at,outcome"));

        let (dataset, report) =
            TrainingDataset::from_reader(csv.as_bytes(), UnknownLabelPolicy::DefaultMedium).unwrap();
        assert_eq!(report.rows_read, 3 * SAMPLE_ROWS_PER_CLASS);
        assert_eq!(report.unrecognized_labels, 0);
        assert_eq!(dataset.class_counts(), [SAMPLE_ROWS_PER_CLASS; 3]);
        assert_eq!(dataset.rows()[0].record.created_at.as_deref(), Some("2024-05-27"));
    }
}
